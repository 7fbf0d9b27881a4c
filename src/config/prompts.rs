//! Prompt templates for the refinement and retrieval chains.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub refinement: RefinementPrompts,
    pub retrieval: RetrievalPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompt for turning a user question into a search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementPrompts {
    pub user: String,
}

impl Default for RefinementPrompts {
    fn default() -> Self {
        Self {
            user: "Create a focused Bible search query based on: {{original_question}}".to_string(),
        }
    }
}

/// Prompts for answering from retrieved passages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalPrompts {
    pub system: String,
    pub user: String,
}

impl Default for RetrievalPrompts {
    fn default() -> Self {
        Self {
            system: "You are a helpful Bible assistant.".to_string(),
            user: "Based on this context:\n{{context}}\n\nPlease answer this question:\n{{question}}"
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let refinement_path = custom_path.join("refinement.toml");
            if refinement_path.exists() {
                let content = std::fs::read_to_string(&refinement_path)?;
                prompts.refinement = toml::from_str(&content)?;
            }

            let retrieval_path = custom_path.join("retrieval.toml");
            if retrieval_path.exists() {
                let content = std::fs::read_to_string(&retrieval_path)?;
                prompts.retrieval = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// The template is scanned once; substituted values are copied verbatim and
    /// never rendered again. Unknown placeholders are left in place.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                result.push_str(&rest[start..]);
                return result;
            };

            let name = &after[..end];
            match vars.get(name) {
                Some(value) => result.push_str(value),
                None => result.push_str(&rest[start..start + end + 4]),
            }
            rest = &after[end + 2..];
        }

        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
