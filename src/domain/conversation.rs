//! Conversation and its append-only Message children.
//!
//! Parent-owns-children composition with cascade-delete at the store
//! boundary (§9): in memory we hold messages lazily and never follow a
//! back-pointer from `Message` to `Conversation` on hot paths.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A chat thread owned by a user. `title` auto-derives from the first user
/// message if not supplied. Deleting a conversation cascades to its
/// messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub owner: Uuid,
    pub title: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// An append-only message. Never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: Uuid,
    pub role: Role,
    pub content: String,
    /// Opaque structured record of tool invocations and their results.
    pub tool_calls: Option<Value>,
    pub created_at: NaiveDateTime,
}

/// Maximum accepted length for an inbound chat message (§8 boundary: 1..4000).
pub const MAX_MESSAGE_LEN: usize = 4000;
pub const MIN_MESSAGE_LEN: usize = 1;

pub fn is_valid_message_len(text: &str) -> bool {
    let len = text.chars().count();
    len >= MIN_MESSAGE_LEN && len <= MAX_MESSAGE_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_length_boundaries() {
        assert!(!is_valid_message_len(""));
        assert!(is_valid_message_len("a"));
        assert!(is_valid_message_len(&"a".repeat(4000)));
        assert!(!is_valid_message_len(&"a".repeat(4001)));
    }
}
