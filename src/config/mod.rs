//! Configuration module for the Bible assistant.
//!
//! Handles loading settings, prompt templates and API credentials.

mod prompts;
mod secrets;
mod settings;

pub use prompts::{Prompts, RefinementPrompts, RetrievalPrompts};
pub use secrets::{mask, read_secrets_file, Secrets, HF_TOKEN, REQUIRED_SECRETS};
pub use settings::{
    CacheSettings, EmbeddingSettings, GeneralSettings, LlmSettings, PromptSettings, Settings,
    VectorStoreSettings,
};
