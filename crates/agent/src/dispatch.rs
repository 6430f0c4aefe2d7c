//! Tool dispatch, validation, and identity injection.
//!
//! Sits between the model's tool-call requests and the tool registry. Every
//! failure mode (unknown tool, bad arguments, timeout, storage error) is
//! folded into a structured error outcome that flows back into the model's
//! context; dispatch itself never fails the request.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use taskpilot_core::error::ToolError;
use taskpilot_core::message::AssistantToolCall;
use taskpilot_core::provider::ToolDefinition;
use taskpilot_core::tool::{ToolCallRecord, ToolKind, ToolOutcome, ToolRegistry};
use tracing::{debug, warn};

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    tool_timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, tool_timeout: Duration) -> Self {
        Self {
            registry,
            tool_timeout,
        }
    }

    /// Tool definitions to advertise to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Execute one model-requested tool call for the authenticated user.
    ///
    /// `user_id` always comes from the request's authentication context. If
    /// the model smuggled a `user_id` into the arguments it is stripped
    /// before validation.
    pub async fn dispatch(&self, user_id: &str, call: &AssistantToolCall) -> ToolCallRecord {
        let mut args: Value = match serde_json::from_str(&call.arguments) {
            Ok(v @ Value::Object(_)) => v,
            Ok(_) => {
                return ToolCallRecord {
                    tool: call.name.clone(),
                    arguments: Value::Null,
                    outcome: ToolOutcome::error(
                        "ValidationError",
                        "Tool arguments must be a JSON object",
                    ),
                };
            }
            Err(e) => {
                return ToolCallRecord {
                    tool: call.name.clone(),
                    arguments: Value::Null,
                    outcome: ToolOutcome::error(
                        "ValidationError",
                        format!("Tool arguments were not valid JSON: {e}"),
                    ),
                };
            }
        };

        // Identity injection. Model-supplied user_id is never trusted.
        if let Some(obj) = args.as_object_mut() {
            if let Some(supplied) = obj.remove("user_id") {
                if supplied.as_str() != Some(user_id) {
                    warn!(
                        tool = %call.name,
                        "Model supplied a mismatched user_id; stripped"
                    );
                }
            }
        }

        let kind = match ToolKind::parse(&call.name) {
            Some(k) => k,
            None => {
                warn!(tool = %call.name, "Model requested an unknown tool");
                return ToolCallRecord {
                    tool: call.name.clone(),
                    arguments: args,
                    outcome: ToolOutcome::error(
                        "UnknownToolError",
                        format!("Unknown tool: {}", call.name),
                    ),
                };
            }
        };

        let tool = match self.registry.get(kind) {
            Some(t) => t,
            None => {
                return ToolCallRecord {
                    tool: call.name.clone(),
                    arguments: args,
                    outcome: ToolOutcome::error(
                        "UnknownToolError",
                        format!("Unknown tool: {}", call.name),
                    ),
                };
            }
        };

        if let Err(msg) = tool.validate(&args) {
            debug!(tool = %call.name, %msg, "Tool arguments failed validation");
            return ToolCallRecord {
                tool: call.name.clone(),
                arguments: args,
                outcome: ToolOutcome::error("ValidationError", msg),
            };
        }

        let outcome = match tokio::time::timeout(self.tool_timeout, tool.execute(user_id, &args))
            .await
        {
            Err(_) => {
                warn!(
                    tool = %call.name,
                    timeout_secs = self.tool_timeout.as_secs(),
                    "Tool execution timed out"
                );
                ToolOutcome::error("TimeoutError", "The operation timed out. Please try again.")
            }
            Ok(Err(ToolError::Store(e))) => {
                warn!(tool = %call.name, error = %e, "Tool storage failure");
                ToolOutcome::error("DatabaseError", "The operation failed. Please try again.")
            }
            Ok(Err(e)) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                ToolOutcome::error("ToolError", "The operation failed. Please try again.")
            }
            Ok(Ok(outcome)) => outcome,
        };

        ToolCallRecord {
            tool: call.name.clone(),
            arguments: args,
            outcome,
        }
    }
}
