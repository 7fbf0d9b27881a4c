//! Normalisation of chain outputs to plain text.

use crate::llm::AssistantMessage;
use serde_json::{Map, Value};

/// What a chain step hands back.
///
/// Text is read in a fixed order: the requested key of a mapping, the
/// `content` of an assistant message, then the whole value as a string.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutput {
    /// Keyed output, e.g. `{"query": ..., "result": ...}`.
    Mapping(Map<String, Value>),
    /// A model reply.
    Message(AssistantMessage),
    /// Anything else.
    Other(Value),
}

impl ChainOutput {
    /// Extract text. A mapping without `key` yields an empty string.
    pub fn text(&self, key: &str) -> String {
        match self {
            ChainOutput::Mapping(map) => map.get(key).map(value_text).unwrap_or_default(),
            ChainOutput::Message(message) => message.content.clone(),
            ChainOutput::Other(value) => value_text(value),
        }
    }
}

impl std::fmt::Display for ChainOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainOutput::Mapping(map) => write!(f, "{}", Value::Object(map.clone())),
            ChainOutput::Message(message) => write!(f, "{}", message.content),
            ChainOutput::Other(value) => write!(f, "{}", value_text(value)),
        }
    }
}

impl From<AssistantMessage> for ChainOutput {
    fn from(message: AssistantMessage) -> Self {
        ChainOutput::Message(message)
    }
}

impl From<Value> for ChainOutput {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => ChainOutput::Mapping(map),
            other => ChainOutput::Other(other),
        }
    }
}

/// Strings are returned bare; every other value is rendered as JSON.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
