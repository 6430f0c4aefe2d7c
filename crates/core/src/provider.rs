//! Provider trait — the abstraction over LLM backends.
//!
//! A Provider knows how to send a context window to a language model and get
//! a single complete response back. The orchestrator treats the model call as
//! an explicit bounded request/response interaction (timeout, retried once on
//! timeout by the caller) rather than an open-ended stream — this keeps the
//! agent loop's termination argument simple.

use crate::error::ProviderError;
use crate::message::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A request to the model for one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g. "gpt-4o-mini").
    pub model: String,

    /// The full context window, system prompt first.
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature (0.0 = deterministic).
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tools the model may call this turn. Empty means tool calling is not
    /// permitted (used for the forced terminal turn).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's model-facing parameters. The `user_id`
    /// parameter is never part of this schema — it is injected server-side.
    pub parameters: serde_json::Value,
}

/// A complete response from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated assistant turn, possibly carrying tool calls.
    pub message: ChatMessage,

    /// Token usage statistics, when the provider reports them.
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested).
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The agent loop calls `complete()` without knowing which backend is in
/// use. Test code substitutes a scripted mock.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g. "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_without_tools_serializes_compactly() {
        let req = ProviderRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.7,
            max_tokens: None,
            tools: vec![],
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("\"tools\""));
        assert!(!json.contains("max_tokens"));
    }

    #[test]
    fn tool_definition_serialization() {
        let tool = ToolDefinition {
            name: "add_task".into(),
            description: "Create a new task".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" }
                },
                "required": ["title"]
            }),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("add_task"));
        assert!(json.contains("title"));
    }
}
