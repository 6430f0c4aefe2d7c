//! Context window assembly.
//!
//! Builds the model's context for one request: system prompt, recent
//! history, current user message. Ownership of the conversation is verified
//! before any history row is read. When the window exceeds its token budget,
//! history is dropped oldest-first; the system prompt and the current user
//! message are never dropped.

use crate::token;
use taskpilot_core::error::StoreError;
use taskpilot_core::message::ChatMessage;
use taskpilot_core::store::ConversationStore;
use tracing::{debug, warn};

/// A fully assembled context window, ready for the agent loop.
#[derive(Debug)]
pub struct AssembledContext {
    /// `None` when this request starts a new conversation. The conversation
    /// row is only created when the exchange is committed.
    pub conversation_id: Option<i64>,
    /// System prompt first, then surviving history, then the current user
    /// message.
    pub turns: Vec<ChatMessage>,
    /// History messages dropped to fit the token budget.
    pub dropped: usize,
}

/// Assembles the per-request context window.
pub struct ContextAssembler {
    max_history: i64,
    max_context_tokens: usize,
    response_headroom_tokens: usize,
    tool_schema_tokens: usize,
}

impl ContextAssembler {
    pub fn new(
        max_history: u32,
        max_context_tokens: u32,
        response_headroom_tokens: u32,
    ) -> Self {
        Self {
            max_history: max_history as i64,
            max_context_tokens: max_context_tokens as usize,
            response_headroom_tokens: response_headroom_tokens as usize,
            tool_schema_tokens: 0,
        }
    }

    /// Reserve room for the tool schemas sent alongside every model call.
    /// The orchestrator sets this from the definitions the loop advertises.
    pub fn with_tool_schema_tokens(mut self, tokens: usize) -> Self {
        self.tool_schema_tokens = tokens;
        self
    }

    /// Load history and build the context window.
    ///
    /// For an existing conversation, ownership is checked before any message
    /// is read; a foreign conversation fails with
    /// [`StoreError::ConversationForbidden`] without touching history.
    pub async fn assemble(
        &self,
        store: &dyn ConversationStore,
        user_id: &str,
        conversation_id: Option<i64>,
        user_text: &str,
        system_prompt: &str,
    ) -> Result<AssembledContext, StoreError> {
        let mut history: Vec<ChatMessage> = Vec::new();

        if let Some(id) = conversation_id {
            store.get_conversation(id, user_id).await?;
            history = store
                .recent_messages(id, self.max_history)
                .await?
                .iter()
                .map(|m| m.to_chat())
                .collect();
        }

        let system = ChatMessage::system(system_prompt);
        let current = ChatMessage::user(user_text);

        // Budget for the prompt side of the window.
        let budget = self
            .max_context_tokens
            .saturating_sub(self.response_headroom_tokens);
        let fixed = token::message_tokens(&system)
            + token::message_tokens(&current)
            + self.tool_schema_tokens;

        let mut dropped = 0;
        while !history.is_empty() && fixed + token::total_tokens(&history) > budget {
            history.remove(0);
            dropped += 1;
        }

        if dropped > 0 {
            warn!(
                conversation_id = ?conversation_id,
                dropped,
                "Dropped oldest history to fit context budget"
            );
        }

        let mut turns = Vec::with_capacity(history.len() + 2);
        turns.push(system);
        turns.extend(history);
        turns.push(current);

        debug!(
            conversation_id = ?conversation_id,
            turns = turns.len(),
            estimated_tokens = token::total_tokens(&turns),
            "Assembled context window"
        );

        Ok(AssembledContext {
            conversation_id,
            turns,
            dropped,
        })
    }
}
