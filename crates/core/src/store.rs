//! Storage traits — conversations, messages, tasks, and rate limiting.
//!
//! The orchestrator and tools depend on these traits, never on a concrete
//! database. The sqlite implementation lives in the `taskpilot-store` crate.

use crate::error::StoreError;
use crate::message::{Conversation, StoredMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter for task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    All,
    Pending,
    Completed,
}

impl TaskFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFilter::All => "all",
            TaskFilter::Pending => "pending",
            TaskFilter::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<TaskFilter> {
        match s {
            "all" => Some(TaskFilter::All),
            "pending" => Some(TaskFilter::Pending),
            "completed" => Some(TaskFilter::Completed),
            _ => None,
        }
    }
}

/// One page of a task listing.
#[derive(Debug, Clone, Serialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    /// Total matching tasks, ignoring pagination.
    pub total: i64,
    pub has_more: bool,
}

/// Task persistence. Every operation is scoped to a `user_id`; a task
/// belonging to another user behaves exactly like a task that does not
/// exist.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(
        &self,
        user_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, StoreError>;

    async fn list_tasks(
        &self,
        user_id: &str,
        filter: TaskFilter,
        limit: i64,
        offset: i64,
    ) -> Result<TaskPage, StoreError>;

    /// Mark a task completed. Idempotent: completing an already-completed
    /// task succeeds and returns the task unchanged. Returns `None` when the
    /// task does not exist or belongs to another user.
    async fn complete_task(&self, user_id: &str, task_id: i64)
        -> Result<Option<Task>, StoreError>;

    /// Update any subset of title, description, and completed. The caller
    /// guarantees at least one field is supplied.
    async fn update_task(
        &self,
        user_id: &str,
        task_id: i64,
        title: Option<&str>,
        description: Option<&str>,
        completed: Option<bool>,
    ) -> Result<Option<Task>, StoreError>;

    /// Delete a task, returning it if it existed and belonged to the user.
    async fn delete_task(&self, user_id: &str, task_id: i64)
        -> Result<Option<Task>, StoreError>;
}

/// Conversation persistence.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetch a conversation, verifying ownership. Distinguishes "no such
    /// conversation" from "owned by someone else" so callers can log the
    /// difference; the public surface masks both identically.
    async fn get_conversation(
        &self,
        conversation_id: i64,
        user_id: &str,
    ) -> Result<Conversation, StoreError>;

    /// The most recent `limit` messages of a conversation, returned in
    /// chronological order (oldest first).
    async fn recent_messages(
        &self,
        conversation_id: i64,
        limit: i64,
    ) -> Result<Vec<StoredMessage>, StoreError>;

    /// A user's conversations, most recently updated first.
    async fn list_conversations(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Conversation>, StoreError>;

    /// Persist one completed exchange atomically: create the conversation if
    /// `conversation_id` is `None`, insert the user message and the assistant
    /// message, and touch the conversation's `updated_at`. All of it in one
    /// transaction; a failure leaves no partial rows. Returns the
    /// conversation id.
    async fn commit_exchange(
        &self,
        conversation_id: Option<i64>,
        user_id: &str,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<i64, StoreError>;
}

/// The rejection produced when a rate limit is exceeded.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimited {
    pub limit: u32,
    pub window: &'static str,
    pub retry_after_secs: u64,
}

/// Per-user request rate limiting.
pub trait RateLimiter: Send + Sync {
    /// Record one request for the user, rejecting it if a limit is hit.
    fn check(&self, user_id: &str) -> Result<(), RateLimited>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_filter_parses_known_values() {
        assert_eq!(TaskFilter::parse("all"), Some(TaskFilter::All));
        assert_eq!(TaskFilter::parse("pending"), Some(TaskFilter::Pending));
        assert_eq!(TaskFilter::parse("completed"), Some(TaskFilter::Completed));
        assert_eq!(TaskFilter::parse("done"), None);
    }

    #[test]
    fn task_serializes_with_expected_fields() {
        let task = Task {
            id: 1,
            user_id: "u1".into(),
            title: "Buy milk".into(),
            description: None,
            completed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["completed"], false);
        assert!(json["description"].is_null());
    }
}
