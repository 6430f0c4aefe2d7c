//! The bounded agent loop.
//!
//! Alternates model calls with tool dispatch until the model produces a
//! plain text answer. The number of tool-calling model turns is hard-capped;
//! once the cap is hit, one final model call is made with no tools offered,
//! so the loop always terminates within `max_tool_turns + 1` model turns.

use std::sync::Arc;

use crate::dispatch::ToolDispatcher;
use taskpilot_core::error::ProviderError;
use taskpilot_core::message::ChatMessage;
use taskpilot_core::provider::{Provider, ProviderRequest, ToolDefinition};
use taskpilot_core::tool::ToolCallRecord;
use tracing::{debug, warn};

/// Instruction appended before the forced terminal turn.
const TERMINAL_INSTRUCTION: &str =
    "You have used all available tool calls for this request. Respond to the \
     user now with a final message based on the results so far. Do not \
     request any more tool calls.";

/// Shown when even the forced terminal turn produced no usable text.
const EMPTY_RESPONSE_FALLBACK: &str =
    "I wasn't able to finish that request. Please try again.";

/// The result of one complete loop run.
#[derive(Debug)]
pub struct LoopOutcome {
    /// The assistant's final text answer.
    pub final_text: String,
    /// Every tool call made during the request, in execution order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Model turns consumed, including the forced terminal turn if any.
    pub model_turns: u32,
}

pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    dispatcher: ToolDispatcher,
    max_tool_turns: u32,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        dispatcher: ToolDispatcher,
        max_tool_turns: u32,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            dispatcher,
            max_tool_turns,
        }
    }

    /// Set the maximum tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Tool definitions the loop will advertise to the model.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.dispatcher.definitions()
    }

    /// Call the provider, retrying exactly once if the call timed out.
    /// Tool side effects from a timed-out call may have landed; the retry
    /// re-sends context only, never re-executes tools.
    async fn complete_with_retry(
        &self,
        request: ProviderRequest,
    ) -> Result<taskpilot_core::provider::ProviderResponse, ProviderError> {
        match self.provider.complete(request.clone()).await {
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "Model call timed out, retrying once");
                self.provider.complete(request).await
            }
            other => other,
        }
    }

    /// Run the loop to completion over an assembled context window.
    pub async fn run(
        &self,
        mut turns: Vec<ChatMessage>,
        user_id: &str,
    ) -> Result<LoopOutcome, ProviderError> {
        let tools = self.tool_definitions();
        let mut tool_calls: Vec<ToolCallRecord> = Vec::new();
        let mut model_turns = 0;

        for iteration in 0..self.max_tool_turns {
            model_turns += 1;

            let response = self
                .complete_with_retry(ProviderRequest {
                    model: self.model.clone(),
                    messages: turns.clone(),
                    temperature: self.temperature,
                    max_tokens: self.max_tokens,
                    tools: tools.clone(),
                })
                .await?;

            if response.message.tool_calls.is_empty() {
                debug!(model_turns, "Model produced final text");
                return Ok(LoopOutcome {
                    final_text: Self::text_or_fallback(response.message.content),
                    tool_calls,
                    model_turns,
                });
            }

            debug!(
                iteration,
                count = response.message.tool_calls.len(),
                "Executing tool calls"
            );

            let requested = response.message.tool_calls.clone();
            turns.push(response.message);

            for tc in &requested {
                let record = self.dispatcher.dispatch(user_id, tc).await;
                turns.push(ChatMessage::tool_result(
                    &tc.id,
                    record.outcome.payload.to_string(),
                ));
                tool_calls.push(record);
            }
        }

        // Tool budget exhausted: one last call with no tools offered.
        warn!(
            max_tool_turns = self.max_tool_turns,
            "Tool call budget exhausted, forcing final response"
        );
        turns.push(ChatMessage::system(TERMINAL_INSTRUCTION));
        model_turns += 1;

        let response = self
            .complete_with_retry(ProviderRequest {
                model: self.model.clone(),
                messages: turns,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: Vec::new(),
            })
            .await?;

        // Any tool calls returned here are ignored; only the text counts.
        Ok(LoopOutcome {
            final_text: Self::text_or_fallback(response.message.content),
            tool_calls,
            model_turns,
        })
    }

    /// A blank answer never leaves the loop: the store rejects empty
    /// messages, and the caller promised the user one coherent reply.
    fn text_or_fallback(content: String) -> String {
        if content.trim().is_empty() {
            EMPTY_RESPONSE_FALLBACK.to_string()
        } else {
            content
        }
    }
}
