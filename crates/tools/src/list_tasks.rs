//! Retrieve the user's tasks with filtering and pagination.

use crate::task_json;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use taskpilot_core::error::ToolError;
use taskpilot_core::store::{TaskFilter, TaskStore};
use taskpilot_core::tool::{TaskTool, ToolKind, ToolOutcome};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

pub struct ListTasksTool {
    store: Arc<dyn TaskStore>,
}

impl ListTasksTool {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filter": {
                    "type": "string",
                    "enum": ["all", "pending", "completed"],
                    "description": "Task filter: 'all' for all tasks, 'pending' for incomplete tasks, 'completed' for completed tasks",
                    "default": "all"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of tasks to return (1-200)",
                    "minimum": 1,
                    "maximum": 200,
                    "default": 50
                },
                "offset": {
                    "type": "integer",
                    "description": "Pagination offset (number of tasks to skip)",
                    "minimum": 0,
                    "default": 0
                }
            },
            "required": []
        })
    }

    fn parse_args(args: &Value) -> Result<(TaskFilter, i64, i64), String> {
        let filter = match args.get("filter") {
            None => TaskFilter::All,
            Some(v) if v.is_null() => TaskFilter::All,
            Some(v) => match v.as_str().and_then(TaskFilter::parse) {
                Some(f) => f,
                None => return Err("Filter must be one of: all, pending, completed".into()),
            },
        };

        let limit = match args.get("limit") {
            None => DEFAULT_LIMIT,
            Some(v) if v.is_null() => DEFAULT_LIMIT,
            Some(v) => match v.as_i64() {
                Some(l) if (1..=MAX_LIMIT).contains(&l) => l,
                _ => return Err("Limit must be an integer between 1 and 200".into()),
            },
        };

        let offset = match args.get("offset") {
            None => 0,
            Some(v) if v.is_null() => 0,
            Some(v) => match v.as_i64() {
                Some(o) if o >= 0 => o,
                _ => return Err("Offset must be a non-negative integer".into()),
            },
        };

        Ok((filter, limit, offset))
    }
}

#[async_trait]
impl TaskTool for ListTasksTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ListTasks
    }

    fn description(&self) -> &str {
        "Retrieve the user's tasks with optional filtering by completion status. \
         Returns tasks in reverse chronological order (newest first)."
    }

    fn parameters_schema(&self) -> Value {
        Self::schema()
    }

    fn validate(&self, args: &Value) -> Result<(), String> {
        Self::parse_args(args).map(|_| ())
    }

    async fn execute(&self, user_id: &str, args: &Value) -> Result<ToolOutcome, ToolError> {
        let (filter, limit, offset) = match Self::parse_args(args) {
            Ok(parsed) => parsed,
            Err(msg) => return Ok(ToolOutcome::error("ValidationError", msg)),
        };

        let page = self.store.list_tasks(user_id, filter, limit, offset).await?;
        let tasks: Vec<Value> = page.tasks.iter().map(task_json).collect();

        Ok(ToolOutcome::ok(serde_json::json!({
            "tasks": tasks,
            "total": page.total,
            "has_more": page.has_more,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use taskpilot_store::SqliteStore;

    async fn seeded() -> (Arc<SqliteStore>, ListTasksTool) {
        let store = Arc::new(
            SqliteStore::new(":memory:", Duration::from_secs(5))
                .await
                .unwrap(),
        );
        store.insert_task("u1", "One", None).await.unwrap();
        let done = store.insert_task("u1", "Two", None).await.unwrap();
        store.complete_task("u1", done.id).await.unwrap();
        let tool = ListTasksTool::new(store.clone());
        (store, tool)
    }

    #[tokio::test]
    async fn defaults_to_all_tasks() {
        let (_store, tool) = seeded().await;
        let outcome = tool.execute("u1", &serde_json::json!({})).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.payload["total"], 2);
        assert_eq!(outcome.payload["has_more"], false);
    }

    #[tokio::test]
    async fn pending_filter() {
        let (_store, tool) = seeded().await;
        let outcome = tool
            .execute("u1", &serde_json::json!({"filter": "pending"}))
            .await
            .unwrap();
        assert_eq!(outcome.payload["total"], 1);
        assert_eq!(outcome.payload["tasks"][0]["title"], "One");
    }

    #[tokio::test]
    async fn invalid_filter_rejected() {
        let (_store, tool) = seeded().await;
        let args = serde_json::json!({"filter": "done"});
        assert!(tool.validate(&args).is_err());
        let outcome = tool.execute("u1", &args).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.payload["error"], "ValidationError");
    }

    #[tokio::test]
    async fn limit_bounds_enforced() {
        let (_store, tool) = seeded().await;
        assert!(tool.validate(&serde_json::json!({"limit": 0})).is_err());
        assert!(tool.validate(&serde_json::json!({"limit": 201})).is_err());
        assert!(tool.validate(&serde_json::json!({"offset": -1})).is_err());
        assert!(tool.validate(&serde_json::json!({"limit": 200})).is_ok());
    }

    #[tokio::test]
    async fn other_users_see_nothing() {
        let (_store, tool) = seeded().await;
        let outcome = tool.execute("u2", &serde_json::json!({})).await.unwrap();
        assert_eq!(outcome.payload["total"], 0);
        assert_eq!(outcome.payload["tasks"].as_array().unwrap().len(), 0);
    }
}
