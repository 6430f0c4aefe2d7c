//! The closed set of task tools the model may call.
//!
//! Each tool validates the model-supplied arguments, executes against the
//! task store with the server-supplied `user_id`, and returns a structured
//! JSON outcome. Failures become `{"success": false, "error", "message"}`
//! payloads the model can react to; they never escape as request errors.

use std::sync::Arc;

use serde_json::Value;
use taskpilot_core::store::{Task, TaskStore};
use taskpilot_core::tool::ToolRegistry;

pub mod add_task;
pub mod complete_task;
pub mod delete_task;
pub mod list_tasks;
pub mod update_task;

pub use add_task::AddTaskTool;
pub use complete_task::CompleteTaskTool;
pub use delete_task::DeleteTaskTool;
pub use list_tasks::ListTasksTool;
pub use update_task::UpdateTaskTool;

/// Build the full tool registry over a task store.
pub fn registry(store: Arc<dyn TaskStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(AddTaskTool::new(store.clone())));
    registry.register(Box::new(ListTasksTool::new(store.clone())));
    registry.register(Box::new(CompleteTaskTool::new(store.clone())));
    registry.register(Box::new(UpdateTaskTool::new(store.clone())));
    registry.register(Box::new(DeleteTaskTool::new(store)));
    registry
}

/// Serialize a task into the wire shape shared by every tool payload.
pub(crate) fn task_json(task: &Task) -> Value {
    serde_json::json!({
        "id": task.id,
        "user_id": task.user_id,
        "title": task.title,
        "description": task.description,
        "completed": task.completed,
        "created_at": task.created_at.to_rfc3339(),
        "updated_at": task.updated_at.to_rfc3339(),
    })
}

/// Extract and validate a positive integer `task_id` argument.
pub(crate) fn require_task_id(args: &Value) -> Result<i64, String> {
    match args.get("task_id").and_then(Value::as_i64) {
        Some(id) if id >= 1 => Ok(id),
        Some(_) => Err("task_id must be a positive integer".into()),
        None => Err("task_id must be an integer".into()),
    }
}

/// Validate a title argument: non-blank after trimming, at most 200 chars,
/// no NUL bytes.
pub(crate) fn check_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title must not be empty".into());
    }
    if title.trim().chars().count() > 200 {
        return Err("Title must be between 1 and 200 characters".into());
    }
    if title.contains('\0') {
        return Err("Title contains invalid characters".into());
    }
    Ok(())
}

/// Validate a description argument: at most 1000 chars, no NUL bytes.
pub(crate) fn check_description(description: &str) -> Result<(), String> {
    if description.chars().count() > 1000 {
        return Err("Description must be 1000 characters or less".into());
    }
    if description.contains('\0') {
        return Err("Description contains invalid characters".into());
    }
    Ok(())
}
