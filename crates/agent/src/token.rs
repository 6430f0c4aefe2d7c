//! Token estimation for context budgeting.
//!
//! Uses the chars/4 heuristic rather than a real tokenizer. The budget
//! exists to keep context windows bounded, not to bill exactly, and the
//! heuristic overestimates slightly for English text which errs on the safe
//! side.

use taskpilot_core::message::ChatMessage;
use taskpilot_core::provider::ToolDefinition;

/// Per-message structural overhead (role framing, delimiters).
const MESSAGE_OVERHEAD: usize = 4;

/// Estimate the token count of a piece of text: chars / 4, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Estimate the token cost of one context turn, including tool call
/// arguments and framing overhead.
pub fn message_tokens(message: &ChatMessage) -> usize {
    let mut tokens = estimate_tokens(&message.content) + MESSAGE_OVERHEAD;
    for tc in &message.tool_calls {
        tokens += estimate_tokens(&tc.name) + estimate_tokens(&tc.arguments);
    }
    tokens
}

/// Total estimated tokens for a sequence of turns.
pub fn total_tokens(messages: &[ChatMessage]) -> usize {
    messages.iter().map(message_tokens).sum()
}

/// Estimate the token cost of the tool schemas sent with each model call.
pub fn definition_tokens(definitions: &[ToolDefinition]) -> usize {
    definitions
        .iter()
        .map(|d| {
            let serialized = serde_json::to_string(d).unwrap_or_default();
            estimate_tokens(&serialized) + MESSAGE_OVERHEAD
        })
        .sum()
}
