//! Chat session state.
//!
//! A session is an ordered, append-only log of `{role, content}` records. A
//! message identical to the most recent entry is not appended again, so
//! replaying the same turn never duplicates it.

use crate::llm::{Message, Role};
use chrono::{DateTime, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One conversation with the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    messages: Vec<Message>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    /// Append a message unless it repeats the most recent entry.
    /// Returns whether the message was appended.
    pub fn update_chat(&mut self, role: Role, content: impl Into<String>) -> bool {
        let message = Message::new(role, content);
        if self.messages.last() == Some(&message) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Append the reply to `question`, provided the log still ends with that
    /// question from the user. Returns whether the reply was appended.
    pub fn complete_turn(&mut self, question: &str, reply: impl Into<String>) -> bool {
        if self.messages.last() != Some(&Message::user(question)) {
            return false;
        }
        self.update_chat(Role::Assistant, reply)
    }

    /// Start a new chat, dropping the history.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Greeting for an hour of the day (0-23).
pub fn greeting_for_hour(hour: u32) -> &'static str {
    if hour < 12 {
        "Good Morning"
    } else if hour < 17 {
        "Good Afternoon"
    } else {
        "Good Evening"
    }
}

/// Greeting for the current local time.
pub fn greeting() -> &'static str {
    greeting_for_hour(Local::now().hour())
}
