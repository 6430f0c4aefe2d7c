//! Mark a task as completed. Idempotent.

use crate::{require_task_id, task_json};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use taskpilot_core::error::ToolError;
use taskpilot_core::store::TaskStore;
use taskpilot_core::tool::{TaskTool, ToolKind, ToolOutcome};
use tracing::info;

pub struct CompleteTaskTool {
    store: Arc<dyn TaskStore>,
}

impl CompleteTaskTool {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "integer",
                    "description": "ID of the task to mark as complete",
                    "minimum": 1
                }
            },
            "required": ["task_id"]
        })
    }
}

#[async_trait]
impl TaskTool for CompleteTaskTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CompleteTask
    }

    fn description(&self) -> &str {
        "Mark an existing task as completed. This is idempotent - completing an \
         already-completed task will succeed."
    }

    fn parameters_schema(&self) -> Value {
        Self::schema()
    }

    fn validate(&self, args: &Value) -> Result<(), String> {
        require_task_id(args).map(|_| ())
    }

    async fn execute(&self, user_id: &str, args: &Value) -> Result<ToolOutcome, ToolError> {
        let task_id = match require_task_id(args) {
            Ok(id) => id,
            Err(msg) => return Ok(ToolOutcome::error("ValidationError", msg)),
        };

        match self.store.complete_task(user_id, task_id).await? {
            Some(task) => {
                info!(task_id, user_id, "Completed task");
                Ok(ToolOutcome::ok(serde_json::json!({
                    "task": task_json(&task),
                })))
            }
            None => Ok(ToolOutcome::error(
                "NotFoundError",
                "Task not found or does not belong to user",
            )),
        }
    }
}
