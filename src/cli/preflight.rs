//! Pre-flight checks before any remote call.
//!
//! Validates that secrets and the system prompt are available so commands
//! stop with a clear message instead of failing midway.

use crate::config::{Secrets, Settings};
use crate::error::{AssistantError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering needs every secret and the system prompt.
    Answer,
    /// Search does not load the system prompt.
    Search,
}

/// Run pre-flight checks for the given operation and return the resolved secrets.
pub fn check(operation: Operation, settings: &Settings) -> Result<Secrets> {
    let secrets = Secrets::resolve(Some(&settings.secrets_path()))?;

    if let Operation::Answer = operation {
        let path = settings.system_prompt_path();
        if !path.is_file() {
            return Err(AssistantError::SystemPromptNotFound(path.display().to_string()));
        }
    }

    Ok(secrets)
}
