//! Create a new task for the authenticated user.

use crate::{check_description, check_title, task_json};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use taskpilot_core::error::ToolError;
use taskpilot_core::store::TaskStore;
use taskpilot_core::tool::{TaskTool, ToolKind, ToolOutcome};
use tracing::info;

pub struct AddTaskTool {
    store: Arc<dyn TaskStore>,
}

impl AddTaskTool {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Task title (1-200 characters)",
                    "minLength": 1,
                    "maxLength": 200
                },
                "description": {
                    "type": "string",
                    "description": "Optional task description (max 1000 characters)",
                    "maxLength": 1000
                }
            },
            "required": ["title"]
        })
    }
}

#[async_trait]
impl TaskTool for AddTaskTool {
    fn kind(&self) -> ToolKind {
        ToolKind::AddTask
    }

    fn description(&self) -> &str {
        "Create a new task for the user. Requires a title; an optional description may be provided."
    }

    fn parameters_schema(&self) -> Value {
        Self::schema()
    }

    fn validate(&self, args: &Value) -> Result<(), String> {
        let title = match args.get("title").and_then(Value::as_str) {
            Some(t) => t,
            None => return Err("Title must not be empty".into()),
        };
        check_title(title)?;

        if let Some(desc) = args.get("description") {
            match desc.as_str() {
                Some(d) => check_description(d)?,
                None if desc.is_null() => {}
                None => return Err("Description must be a string".into()),
            }
        }

        Ok(())
    }

    async fn execute(&self, user_id: &str, args: &Value) -> Result<ToolOutcome, ToolError> {
        let title = args
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim();

        let description = args
            .get("description")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let task = self.store.insert_task(user_id, title, description).await?;
        info!(task_id = task.id, user_id, "Created task");

        Ok(ToolOutcome::ok(serde_json::json!({
            "task": task_json(&task),
        })))
    }
}
