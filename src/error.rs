//! Error types for the Bible assistant.

use thiserror::Error;

/// Library-level error type for assistant operations.
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required secret: {0}")]
    MissingSecret(String),

    #[error("System prompt file not found: {0}")]
    SystemPromptNotFound(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Chain error: {0}")]
    Chain(String),

    #[error("Chat session not found: {0}")]
    SessionNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for assistant operations.
pub type Result<T> = std::result::Result<T, AssistantError>;
