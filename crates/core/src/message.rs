//! Conversation and message domain types.
//!
//! Two distinct message shapes flow through the system:
//!
//! - [`StoredMessage`] — a durable row in the conversation store. Only `user`
//!   and `assistant` turns are ever persisted; tool traffic is ephemeral.
//! - [`ChatMessage`] — an in-flight turn in the model's context window,
//!   including system instructions and tool-result turns that exist only for
//!   the duration of one request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum characters allowed in a stored message body.
pub const MAX_MESSAGE_CHARS: usize = 10_000;

/// A durable chat session owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    /// Touched by every appended message; always >= the newest message's
    /// `created_at`.
    pub updated_at: DateTime<Utc>,
}

/// The role of a persisted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// A persisted message. Immutable once written; ordered within a
/// conversation by `created_at` ascending (ties broken by `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub conversation_id: i64,
    /// Always equals the owning conversation's `user_id`.
    pub user_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    /// Convert to an in-flight turn for the model's context window.
    pub fn to_chat(&self) -> ChatMessage {
        match self.role {
            Role::User => ChatMessage::user(&self.content),
            Role::Assistant => ChatMessage::assistant(&self.content),
        }
    }
}

/// The role of an in-flight context turn (wire format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool call embedded in an assistant turn, as returned by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantToolCall {
    /// The model's call ID, echoed back in the matching tool-result turn.
    pub id: String,
    pub name: String,
    /// Arguments as a raw JSON string, exactly as the model produced them.
    pub arguments: String,
}

/// One turn in the model's context window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,

    /// Tool calls requested by the assistant (if any).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<AssistantToolCall>,

    /// If this is a tool result, which tool call it responds to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// A tool-result turn responding to `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Validate a message body against the storage bounds: non-blank, at most
/// [`MAX_MESSAGE_CHARS`] characters.
pub fn validate_message_content(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("message must not be empty".into());
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(format!(
            "message must be at most {MAX_MESSAGE_CHARS} characters"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_message_converts_to_chat_turn() {
        let msg = StoredMessage {
            id: 1,
            conversation_id: 1,
            user_id: "u1".into(),
            role: Role::User,
            content: "hello".into(),
            created_at: Utc::now(),
        };
        let chat = msg.to_chat();
        assert_eq!(chat.role, ChatRole::User);
        assert_eq!(chat.content, "hello");
        assert!(chat.tool_calls.is_empty());
    }

    #[test]
    fn role_round_trips_through_strings() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse("system"), None);
        assert_eq!(Role::User.as_str(), "user");
    }

    #[test]
    fn content_validation_bounds() {
        assert!(validate_message_content("hi").is_ok());
        assert!(validate_message_content("").is_err());
        assert!(validate_message_content("   \n").is_err());
        assert!(validate_message_content(&"x".repeat(MAX_MESSAGE_CHARS)).is_ok());
        assert!(validate_message_content(&"x".repeat(MAX_MESSAGE_CHARS + 1)).is_err());
    }

    #[test]
    fn tool_result_carries_call_id() {
        let msg = ChatMessage::tool_result("call_1", "{\"success\":true}");
        assert_eq!(msg.role, ChatRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn chat_message_serialization_skips_empty_fields() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert!(!json.contains("tool_calls"));
        assert!(!json.contains("tool_call_id"));
    }
}
