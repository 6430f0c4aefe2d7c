//! The per-request orchestrator.
//!
//! Stateless between requests: every call validates input, assembles the
//! context window from the store, runs the agent loop, and commits the
//! completed exchange in one transaction. The whole pipeline runs under the
//! end-to-end request timeout.

use std::sync::Arc;
use std::time::Duration;

use crate::context::ContextAssembler;
use crate::loop_runner::AgentLoop;
use crate::prompt::SYSTEM_PROMPT;
use crate::token;
use taskpilot_core::error::OrchestratorError;
use taskpilot_core::message::validate_message_content;
use taskpilot_core::store::ConversationStore;
use taskpilot_core::tool::ToolCallRecord;
use tracing::{info, warn};

/// The result of one successful chat request.
#[derive(Debug)]
pub struct ChatOutcome {
    /// The conversation this exchange now belongs to (created on first
    /// message).
    pub conversation_id: i64,
    /// The assistant's reply.
    pub response_text: String,
    /// Every tool call made during the request, in execution order.
    pub tool_calls: Vec<ToolCallRecord>,
}

pub struct Orchestrator {
    assembler: ContextAssembler,
    agent: AgentLoop,
    conversations: Arc<dyn ConversationStore>,
    request_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        assembler: ContextAssembler,
        agent: AgentLoop,
        conversations: Arc<dyn ConversationStore>,
        request_timeout: Duration,
    ) -> Self {
        // The tool schemas ride along on every model call and eat into the
        // same window as the prompt turns.
        let schema_tokens = token::definition_tokens(&agent.tool_definitions());
        Self {
            assembler: assembler.with_tool_schema_tokens(schema_tokens),
            agent,
            conversations,
            request_timeout,
        }
    }

    /// Process one user message end to end.
    pub async fn process_message(
        &self,
        user_id: &str,
        conversation_id: Option<i64>,
        text: &str,
    ) -> Result<ChatOutcome, OrchestratorError> {
        tokio::time::timeout(
            self.request_timeout,
            self.handle(user_id, conversation_id, text),
        )
        .await
        .map_err(|_| {
            warn!(
                timeout_secs = self.request_timeout.as_secs(),
                "Request exceeded end-to-end budget"
            );
            OrchestratorError::RequestTimeout
        })?
    }

    async fn handle(
        &self,
        user_id: &str,
        conversation_id: Option<i64>,
        text: &str,
    ) -> Result<ChatOutcome, OrchestratorError> {
        validate_message_content(text).map_err(OrchestratorError::InputValidation)?;

        let context = self
            .assembler
            .assemble(
                self.conversations.as_ref(),
                user_id,
                conversation_id,
                text,
                SYSTEM_PROMPT,
            )
            .await?;

        let outcome = self.agent.run(context.turns, user_id).await?;

        // Tool side effects from earlier turns survive even if this commit
        // fails; the caller only loses the chat transcript of the exchange.
        let conversation_id = self
            .conversations
            .commit_exchange(
                context.conversation_id,
                user_id,
                text,
                &outcome.final_text,
            )
            .await?;

        info!(
            conversation_id,
            model_turns = outcome.model_turns,
            tool_calls = outcome.tool_calls.len(),
            "Completed chat exchange"
        );

        Ok(ChatOutcome {
            conversation_id,
            response_text: outcome.final_text,
            tool_calls: outcome.tool_calls,
        })
    }
}
