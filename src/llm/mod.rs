//! Chat model abstraction.
//!
//! Chains talk to a [`ChatModel`]; the production implementation is
//! [`MistralChat`], optionally wrapped in a [`CachedChatModel`].

mod cached;
mod mistral;

pub use cached::CachedChatModel;
pub use mistral::{create_client, MistralChat};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" | "human" => Ok(Role::User),
            "assistant" | "ai" => Ok(Role::Assistant),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// A `{role, content}` record, used for prompts and for the chat log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A completion returned by a chat model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub content: String,
    /// Model that produced the completion, when reported.
    #[serde(default)]
    pub model: Option<String>,
}

impl AssistantMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: None,
        }
    }
}

/// Trait for chat completion backends.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete a conversation.
    async fn complete(&self, messages: &[Message]) -> Result<AssistantMessage>;

    /// Identity of the model and its sampling parameters, used for cache keys.
    fn identity(&self) -> String;
}

/// Merge leading system messages into `system_prompt` so the request carries
/// exactly one system message, placed first.
pub fn with_system_prompt(system_prompt: &str, messages: &[Message]) -> Vec<Message> {
    let mut system_parts: Vec<&str> = Vec::new();
    if !system_prompt.trim().is_empty() {
        system_parts.push(system_prompt.trim());
    }

    let mut rest = Vec::with_capacity(messages.len());
    for message in messages {
        if message.role == Role::System {
            system_parts.push(message.content.trim());
        } else {
            rest.push(message.clone());
        }
    }

    let mut merged = Vec::with_capacity(rest.len() + 1);
    if !system_parts.is_empty() {
        merged.push(Message::system(system_parts.join("\n\n")));
    }
    merged.extend(rest);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_merged_first() {
        let messages = vec![
            Message::system("You are a helpful Bible assistant."),
            Message::user("Who was Moses?"),
        ];

        let merged = with_system_prompt("Quote scripture with references.", &messages);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].role, Role::System);
        assert_eq!(
            merged[0].content,
            "Quote scripture with references.\n\nYou are a helpful Bible assistant."
        );
        assert_eq!(merged[1], Message::user("Who was Moses?"));
    }

    #[test]
    fn test_blank_system_prompt_adds_nothing() {
        let messages = vec![Message::user("Explain the Lord's Prayer")];
        let merged = with_system_prompt("  \n", &messages);
        assert_eq!(merged, messages);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("Amen")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"Amen"}"#);
        assert_eq!("human".parse::<Role>().unwrap(), Role::User);
    }
}
