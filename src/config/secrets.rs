//! API credentials.
//!
//! Secrets come from the process environment (after `.env` has been loaded)
//! and fall back to a flat TOML secrets file.

use crate::error::{AssistantError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Names of the secrets that must be present before any remote call.
pub const REQUIRED_SECRETS: [&str; 3] =
    ["MISTRAL_API_KEY", "PINECONE_API_KEY", "PINECONE_ENVIRONMENT"];

/// Optional token for the hosted embedding endpoint.
pub const HF_TOKEN: &str = "HF_TOKEN";

/// Resolved credentials for the remote services.
#[derive(Clone)]
pub struct Secrets {
    pub mistral_api_key: String,
    pub pinecone_api_key: String,
    pub pinecone_environment: String,
    pub hf_token: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("mistral_api_key", &mask(&self.mistral_api_key))
            .field("pinecone_api_key", &mask(&self.pinecone_api_key))
            .field("pinecone_environment", &self.pinecone_environment)
            .field("hf_token", &self.hf_token.as_deref().map(mask))
            .finish()
    }
}

impl Secrets {
    /// Resolve secrets from the environment and the optional secrets file.
    pub fn resolve(secrets_file: Option<&Path>) -> Result<Self> {
        Self::resolve_with(secrets_file, |name| std::env::var(name).ok())
    }

    /// Resolve secrets from `env`, falling back to the secrets file per name.
    pub fn resolve_with<E>(secrets_file: Option<&Path>, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let file = match secrets_file {
            Some(path) if path.exists() => read_secrets_file(path)?,
            _ => HashMap::new(),
        };
        Self::from_lookup(|name| env(name).or_else(|| file.get(name).cloned()))
    }

    /// Build secrets from an arbitrary name lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AssistantError::MissingSecret(name.to_string()))
        };

        Ok(Self {
            mistral_api_key: required("MISTRAL_API_KEY")?,
            pinecone_api_key: required("PINECONE_API_KEY")?,
            pinecone_environment: required("PINECONE_ENVIRONMENT")?,
            hf_token: lookup(HF_TOKEN).filter(|v| !v.trim().is_empty()),
        })
    }
}

/// Read a flat `KEY = "value"` TOML file. Non-string values are ignored.
pub fn read_secrets_file(path: &Path) -> Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&content)?;
    Ok(table
        .into_iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
        .collect())
}

/// Mask a secret for display, keeping a short prefix and suffix.
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
