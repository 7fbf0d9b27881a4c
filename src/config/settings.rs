//! Configuration settings for the Bible assistant.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub cache: CacheSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// File holding the system prompt sent with every model call.
    pub system_prompt_path: String,
    /// TOML file with secrets (MISTRAL_API_KEY, PINECONE_API_KEY, ...).
    pub secrets_file: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            system_prompt_path: "system_prompt.txt".to_string(),
            secrets_file: "secrets.toml".to_string(),
        }
    }
}

/// Chat model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Chat model name.
    pub model: String,
    /// Base URL of the OpenAI-compatible chat API.
    pub api_base: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Optional completion length limit.
    pub max_tokens: Option<u32>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "mistral-large-latest".to_string(),
            api_base: "https://api.mistral.ai/v1".to_string(),
            temperature: 0.7,
            max_tokens: None,
            timeout_secs: 120,
        }
    }
}

/// Embedding endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model name. Must match the model the index was built with.
    pub model: String,
    /// Feature-extraction endpoint (hosted inference or a local TEI server).
    pub endpoint: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// L2-normalize returned vectors.
    pub normalize: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "BAAI/bge-small-en-v1.5".to_string(),
            endpoint: "https://router.huggingface.co/hf-inference/models/BAAI/bge-small-en-v1.5/pipeline/feature-extraction".to_string(),
            dimensions: 384,
            normalize: true,
            timeout_secs: 60,
        }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Pinecone index name.
    pub index_name: String,
    /// Namespace holding the passage vectors.
    pub namespace: String,
    /// Metadata field carrying the passage text.
    pub text_key: String,
    /// Data-plane host. Resolved from the control plane when unset.
    pub index_host: Option<String>,
    /// Pinecone control-plane URL.
    pub controller_url: String,
    /// Pinecone REST API version header.
    pub api_version: String,
    /// Number of passages retrieved per question.
    pub top_k: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            index_name: "data".to_string(),
            namespace: "text_chunks".to_string(),
            text_key: "text".to_string(),
            index_host: None,
            controller_url: "https://api.pinecone.io".to_string(),
            api_version: "2024-07".to_string(),
            top_k: 4,
            timeout_secs: 30,
        }
    }
}

/// In-memory response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Cache answers and model completions.
    pub enabled: bool,
    /// Maximum entries held per cache.
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 256,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::AssistantError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bible-assistant")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded system prompt path.
    pub fn system_prompt_path(&self) -> PathBuf {
        Self::expand_path(&self.general.system_prompt_path)
    }

    /// Get the expanded secrets file path.
    pub fn secrets_path(&self) -> PathBuf {
        Self::expand_path(&self.general.secrets_file)
    }

    /// Read the system prompt file.
    pub fn load_system_prompt(&self) -> crate::error::Result<String> {
        let path = self.system_prompt_path();
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                crate::error::AssistantError::SystemPromptNotFound(path.display().to_string())
            }
            _ => e.into(),
        })
    }
}
