//! Modify a task's title, description, and/or completion status.

use crate::{check_description, check_title, require_task_id, task_json};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use taskpilot_core::error::ToolError;
use taskpilot_core::store::TaskStore;
use taskpilot_core::tool::{TaskTool, ToolKind, ToolOutcome};
use tracing::info;

pub struct UpdateTaskTool {
    store: Arc<dyn TaskStore>,
}

impl UpdateTaskTool {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "integer",
                    "description": "ID of the task to update",
                    "minimum": 1
                },
                "title": {
                    "type": "string",
                    "description": "New task title (1-200 characters)",
                    "minLength": 1,
                    "maxLength": 200
                },
                "description": {
                    "type": "string",
                    "description": "New task description (max 1000 characters)",
                    "maxLength": 1000
                },
                "completed": {
                    "type": "boolean",
                    "description": "Mark task as completed (true) or incomplete (false)"
                }
            },
            "required": ["task_id"]
        })
    }

    fn check_fields(args: &Value) -> Result<(), String> {
        let title = args.get("title").filter(|v| !v.is_null());
        let description = args.get("description").filter(|v| !v.is_null());
        let completed = args.get("completed").filter(|v| !v.is_null());

        if title.is_none() && description.is_none() && completed.is_none() {
            return Err(
                "At least one of title, description, or completed must be provided".into(),
            );
        }

        if let Some(t) = title {
            match t.as_str() {
                Some(t) => check_title(t)?,
                None => return Err("Title must be a string".into()),
            }
        }

        if let Some(d) = description {
            match d.as_str() {
                Some(d) => check_description(d)?,
                None => return Err("Description must be a string".into()),
            }
        }

        if let Some(c) = completed {
            if !c.is_boolean() {
                return Err("Completed must be a boolean value (true or false)".into());
            }
        }

        Ok(())
    }
}

#[async_trait]
impl TaskTool for UpdateTaskTool {
    fn kind(&self) -> ToolKind {
        ToolKind::UpdateTask
    }

    fn description(&self) -> &str {
        "Modify an existing task's title, description, and/or completion status. \
         At least one field must be provided."
    }

    fn parameters_schema(&self) -> Value {
        Self::schema()
    }

    fn validate(&self, args: &Value) -> Result<(), String> {
        require_task_id(args)?;
        Self::check_fields(args)
    }

    async fn execute(&self, user_id: &str, args: &Value) -> Result<ToolOutcome, ToolError> {
        let task_id = match require_task_id(args) {
            Ok(id) => id,
            Err(msg) => return Ok(ToolOutcome::error("ValidationError", msg)),
        };
        if let Err(msg) = Self::check_fields(args) {
            return Ok(ToolOutcome::error("ValidationError", msg));
        }

        let title = args.get("title").and_then(Value::as_str).map(str::trim);
        let description = args
            .get("description")
            .and_then(Value::as_str)
            .map(str::trim);
        let completed = args.get("completed").and_then(Value::as_bool);

        match self
            .store
            .update_task(user_id, task_id, title, description, completed)
            .await?
        {
            Some(task) => {
                info!(task_id, user_id, "Updated task");
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use taskpilot_store::SqliteStore;

    async fn setup() -> (Arc<SqliteStore>, UpdateTaskTool) {
        let store = Arc::new(
            SqliteStore::new(":memory:", Duration::from_secs(5))
                .await
                .unwrap(),
        );
        let tool = UpdateTaskTool::new(store.clone());
        (store, tool)
    }

    #[tokio::test]
    async fn updates_title_only() {
        let (store, tool) = setup().await;
        let task = store
            .insert_task("u1", "Buy milk", Some("2 liters"))
            .await
            .unwrap();

        let outcome = tool
            .execute(
                "u1",
                &serde_json::json!({"task_id": task.id, "title": "Buy oat milk"}),
            )
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.payload["task"]["title"], "Buy oat milk");
        assert_eq!(outcome.payload["task"]["description"], "2 liters");
    }

    #[tokio::test]
    async fn can_reopen_completed_task() {
        let (store, tool) = setup().await;
        let task = store.insert_task("u1", "Buy milk", None).await.unwrap();
        store.complete_task("u1", task.id).await.unwrap();

        let outcome = tool
            .execute(
                "u1",
                &serde_json::json!({"task_id": task.id, "completed": false}),
            )
            .await
            .unwrap();
        assert_eq!(outcome.payload["task"]["completed"], false);
    }

    #[tokio::test]
    async fn rejects_empty_update() {
        let (store, tool) = setup().await;
        let task = store.insert_task("u1", "Buy milk", None).await.unwrap();

        let args = serde_json::json!({"task_id": task.id});
        assert!(tool.validate(&args).is_err());
        let outcome = tool.execute("u1", &args).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.payload["error"], "ValidationError");
    }

    #[tokio::test]
    async fn foreign_task_reported_as_not_found() {
        let (store, tool) = setup().await;
        let task = store.insert_task("alice", "Secret", None).await.unwrap();

        let outcome = tool
            .execute(
                "bob",
                &serde_json::json!({"task_id": task.id, "title": "Mine now"}),
            )
            .await
            .unwrap();
        assert_eq!(outcome.payload["error"], "NotFoundError");
    }
}
