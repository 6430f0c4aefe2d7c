//! Permanently remove a task.

use crate::require_task_id;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use taskpilot_core::error::ToolError;
use taskpilot_core::store::TaskStore;
use taskpilot_core::tool::{TaskTool, ToolKind, ToolOutcome};
use tracing::info;

pub struct DeleteTaskTool {
    store: Arc<dyn TaskStore>,
}

impl DeleteTaskTool {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "integer",
                    "description": "ID of the task to delete",
                    "minimum": 1
                }
            },
            "required": ["task_id"]
        })
    }
}

#[async_trait]
impl TaskTool for DeleteTaskTool {
    fn kind(&self) -> ToolKind {
        ToolKind::DeleteTask
    }

    fn description(&self) -> &str {
        "Permanently remove a task from the user's task list. This action cannot be undone."
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

        match self.store.delete_task(user_id, task_id).await? {
            Some(task) => {
                info!(task_id = task.id, user_id, "Deleted task");
                Ok(ToolOutcome::ok(serde_json::json!({
                    "deleted_task_id": task.id,
                    "message": "Task deleted successfully",
                })))
            }
            None => Ok(ToolOutcome::error(
                "NotFoundError",
                "Task not found or does not belong to user",
            )),
        }
    }
}
