//! SQLite backend for conversations and tasks.
//!
//! Uses a single SQLite database file with three tables:
//! - `conversations` — one row per conversation, owned by a user
//! - `messages` — persisted user/assistant turns, scoped to a conversation
//! - `tasks` — the user's todo items
//!
//! Every query is bounded by a per-query timeout. Writes that span multiple
//! rows (the exchange commit) run inside a single transaction so a failure
//! leaves no partial state.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use taskpilot_core::error::StoreError;
use taskpilot_core::message::{Conversation, Role, StoredMessage};
use taskpilot_core::store::{ConversationStore, Task, TaskFilter, TaskPage, TaskStore};
use tracing::{debug, info};

/// A SQLite-backed implementation of both [`ConversationStore`] and
/// [`TaskStore`].
pub struct SqliteStore {
    pool: SqlitePool,
    query_timeout: Duration,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run migrations.
    ///
    /// Pass `":memory:"` for an in-process ephemeral database (useful for
    /// tests).
    pub async fn new(path: &str, query_timeout: Duration) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Database(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        // A pooled in-memory database is per-connection; pin it to one.
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to open SQLite: {e}")))?;

        let store = Self {
            pool,
            query_timeout,
        };
        store.run_migrations().await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id    TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migration(format!("conversations table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                user_id         TEXT NOT NULL,
                role            TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                content         TEXT NOT NULL CHECK (length(content) BETWEEN 1 AND 10000),
                created_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migration(format!("messages table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL,
                title       TEXT NOT NULL CHECK (length(title) BETWEEN 1 AND 200),
                description TEXT CHECK (description IS NULL OR length(description) <= 1000),
                completed   INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migration(format!("tasks table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversations_user
             ON conversations(user_id, updated_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migration(format!("conversations index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation
             ON messages(conversation_id, created_at, id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migration(format!("messages index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id, completed)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migration(format!("tasks index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Bound a query future by the configured per-query timeout.
    async fn timed<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.query_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.query_timeout.as_secs()))?
    }

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<Task, StoreError> {
        Ok(Task {
            id: row
                .try_get("id")
                .map_err(|e| StoreError::Database(format!("id column: {e}")))?,
            user_id: row
                .try_get("user_id")
                .map_err(|e| StoreError::Database(format!("user_id column: {e}")))?,
            title: row
                .try_get("title")
                .map_err(|e| StoreError::Database(format!("title column: {e}")))?,
            description: row
                .try_get("description")
                .map_err(|e| StoreError::Database(format!("description column: {e}")))?,
            completed: row
                .try_get("completed")
                .map_err(|e| StoreError::Database(format!("completed column: {e}")))?,
            created_at: parse_timestamp(row, "created_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
        })
    }

    fn row_to_conversation(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation, StoreError> {
        Ok(Conversation {
            id: row
                .try_get("id")
                .map_err(|e| StoreError::Database(format!("id column: {e}")))?,
            user_id: row
                .try_get("user_id")
                .map_err(|e| StoreError::Database(format!("user_id column: {e}")))?,
            created_at: parse_timestamp(row, "created_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
        })
    }

    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<StoredMessage, StoreError> {
        let role_str: String = row
            .try_get("role")
            .map_err(|e| StoreError::Database(format!("role column: {e}")))?;
        let role = Role::parse(&role_str)
            .ok_or_else(|| StoreError::Database(format!("unknown role: {role_str}")))?;

        Ok(StoredMessage {
            id: row
                .try_get("id")
                .map_err(|e| StoreError::Database(format!("id column: {e}")))?,
            conversation_id: row
                .try_get("conversation_id")
                .map_err(|e| StoreError::Database(format!("conversation_id column: {e}")))?,
            user_id: row
                .try_get("user_id")
                .map_err(|e| StoreError::Database(format!("user_id column: {e}")))?,
            role,
            content: row
                .try_get("content")
                .map_err(|e| StoreError::Database(format!("content column: {e}")))?,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }

    async fn fetch_task(
        &self,
        user_id: &str,
        task_id: i64,
    ) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ? AND user_id = ?")
            .bind(task_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        row.as_ref().map(Self::row_to_task).transpose()
    }
}

fn parse_timestamp(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<chrono::DateTime<Utc>, StoreError> {
    let raw: String = row
        .try_get(column)
        .map_err(|e| StoreError::Database(format!("{column} column: {e}")))?;
    chrono::DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Database(format!("{column} timestamp: {e}")))
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn insert_task(
        &self,
        user_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, StoreError> {
        self.timed(async {
            let now = Utc::now().to_rfc3339();
            let result = sqlx::query(
                "INSERT INTO tasks (user_id, title, description, completed, created_at, updated_at)
                 VALUES (?, ?, ?, 0, ?, ?)",
            )
            .bind(user_id)
            .bind(title)
            .bind(description)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

            let id = result.last_insert_rowid();
            self.fetch_task(user_id, id)
                .await?
                .ok_or_else(|| StoreError::Database("inserted task not found".into()))
        })
        .await
    }

    async fn list_tasks(
        &self,
        user_id: &str,
        filter: TaskFilter,
        limit: i64,
        offset: i64,
    ) -> Result<TaskPage, StoreError> {
        self.timed(async {
            let completed_clause = match filter {
                TaskFilter::All => "",
                TaskFilter::Pending => " AND completed = 0",
                TaskFilter::Completed => " AND completed = 1",
            };

            let count_sql =
                format!("SELECT COUNT(*) AS n FROM tasks WHERE user_id = ?{completed_clause}");
            let total: i64 = sqlx::query(&count_sql)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?
                .try_get("n")
                .map_err(|e| StoreError::Database(e.to_string()))?;

            let list_sql = format!(
                "SELECT * FROM tasks WHERE user_id = ?{completed_clause}
                 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
            );
            let rows = sqlx::query(&list_sql)
                .bind(user_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;

            let tasks: Vec<Task> = rows
                .iter()
                .map(Self::row_to_task)
                .collect::<Result<_, _>>()?;

            let has_more = offset + (tasks.len() as i64) < total;
            Ok(TaskPage {
                tasks,
                total,
                has_more,
            })
        })
        .await
    }

    async fn complete_task(
        &self,
        user_id: &str,
        task_id: i64,
    ) -> Result<Option<Task>, StoreError> {
        self.timed(async {
            let existing = match self.fetch_task(user_id, task_id).await? {
                Some(task) => task,
                None => return Ok(None),
            };

            // Already completed: return unchanged without touching updated_at.
            if existing.completed {
                return Ok(Some(existing));
            }

            let now = Utc::now().to_rfc3339();
            sqlx::query(
                "UPDATE tasks SET completed = 1, updated_at = ? WHERE id = ? AND user_id = ?",
            )
            .bind(&now)
            .bind(task_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

            self.fetch_task(user_id, task_id).await
        })
        .await
    }

    async fn update_task(
        &self,
        user_id: &str,
        task_id: i64,
        title: Option<&str>,
        description: Option<&str>,
        completed: Option<bool>,
    ) -> Result<Option<Task>, StoreError> {
        self.timed(async {
            let existing = match self.fetch_task(user_id, task_id).await? {
                Some(task) => task,
                None => return Ok(None),
            };

            let new_title = title.unwrap_or(&existing.title);
            let new_description = match description {
                Some(d) => Some(d),
                None => existing.description.as_deref(),
            };
            let new_completed = completed.unwrap_or(existing.completed);
            let now = Utc::now().to_rfc3339();

            sqlx::query(
                "UPDATE tasks SET title = ?, description = ?, completed = ?, updated_at = ?
                 WHERE id = ? AND user_id = ?",
            )
            .bind(new_title)
            .bind(new_description)
            .bind(new_completed)
            .bind(&now)
            .bind(task_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

            self.fetch_task(user_id, task_id).await
        })
        .await
    }

    async fn delete_task(
        &self,
        user_id: &str,
        task_id: i64,
    ) -> Result<Option<Task>, StoreError> {
        self.timed(async {
            let existing = match self.fetch_task(user_id, task_id).await? {
                Some(task) => task,
                None => return Ok(None),
            };

            sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
                .bind(task_id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;

            Ok(Some(existing))
        })
        .await
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn get_conversation(
        &self,
        conversation_id: i64,
        user_id: &str,
    ) -> Result<Conversation, StoreError> {
        self.timed(async {
            let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
                .bind(conversation_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;

            let conversation = match row {
                Some(ref r) => Self::row_to_conversation(r)?,
                None => return Err(StoreError::ConversationNotFound(conversation_id)),
            };

            if conversation.user_id != user_id {
                return Err(StoreError::ConversationForbidden(conversation_id));
            }

            Ok(conversation)
        })
        .await
    }

    async fn recent_messages(
        &self,
        conversation_id: i64,
        limit: i64,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        self.timed(async {
            // Take the newest `limit` rows, then flip back to chronological
            // order for the context window.
            let rows = sqlx::query(
                "SELECT * FROM (
                     SELECT * FROM messages WHERE conversation_id = ?
                     ORDER BY created_at DESC, id DESC LIMIT ?
                 ) ORDER BY created_at ASC, id ASC",
            )
            .bind(conversation_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

            rows.iter().map(Self::row_to_message).collect()
        })
        .await
    }

    async fn list_conversations(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Conversation>, StoreError> {
        self.timed(async {
            let rows = sqlx::query(
                "SELECT * FROM conversations WHERE user_id = ?
                 ORDER BY updated_at DESC, id DESC LIMIT ?",
            )
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

            rows.iter().map(Self::row_to_conversation).collect()
        })
        .await
    }

    async fn commit_exchange(
        &self,
        conversation_id: Option<i64>,
        user_id: &str,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<i64, StoreError> {
        self.timed(async {
            let now = Utc::now().to_rfc3339();

            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;

            let conversation_id = match conversation_id {
                Some(id) => {
                    // Ownership is re-checked inside the transaction so a
                    // conversation deleted or reassigned after assembly
                    // cannot receive rows.
                    let row = sqlx::query("SELECT user_id FROM conversations WHERE id = ?")
                        .bind(id)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(|e| StoreError::Database(e.to_string()))?;

                    match row {
                        None => return Err(StoreError::ConversationNotFound(id)),
                        Some(r) => {
                            let owner: String = r
                                .try_get("user_id")
                                .map_err(|e| StoreError::Database(e.to_string()))?;
                            if owner != user_id {
                                return Err(StoreError::ConversationForbidden(id));
                            }
                        }
                    }
                    id
                }
                None => {
                    let result = sqlx::query(
                        "INSERT INTO conversations (user_id, created_at, updated_at)
                         VALUES (?, ?, ?)",
                    )
                    .bind(user_id)
                    .bind(&now)
                    .bind(&now)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| StoreError::Database(e.to_string()))?;
                    result.last_insert_rowid()
                }
            };

            sqlx::query(
                "INSERT INTO messages (conversation_id, user_id, role, content, created_at)
                 VALUES (?, ?, 'user', ?, ?)",
            )
            .bind(conversation_id)
            .bind(user_id)
            .bind(user_text)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

            sqlx::query(
                "INSERT INTO messages (conversation_id, user_id, role, content, created_at)
                 VALUES (?, ?, 'assistant', ?, ?)",
            )
            .bind(conversation_id)
            .bind(user_id)
            .bind(assistant_text)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

            sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
                .bind(&now)
                .bind(conversation_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;

            tx.commit()
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;

            Ok(conversation_id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        SqliteStore::new(":memory:", Duration::from_secs(5))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn insert_and_list_tasks() {
        let store = store().await;
        store.insert_task("u1", "Buy milk", None).await.unwrap();
        store
            .insert_task("u1", "Walk dog", Some("Around the block"))
            .await
            .unwrap();

        let page = store
            .list_tasks("u1", TaskFilter::All, 50, 0)
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.tasks.len(), 2);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn list_tasks_filters_by_completion() {
        let store = store().await;
        let t1 = store.insert_task("u1", "Done thing", None).await.unwrap();
        store.insert_task("u1", "Open thing", None).await.unwrap();
        store.complete_task("u1", t1.id).await.unwrap();

        let pending = store
            .list_tasks("u1", TaskFilter::Pending, 50, 0)
            .await
            .unwrap();
        assert_eq!(pending.total, 1);
        assert_eq!(pending.tasks[0].title, "Open thing");

        let completed = store
            .list_tasks("u1", TaskFilter::Completed, 50, 0)
            .await
            .unwrap();
        assert_eq!(completed.total, 1);
        assert_eq!(completed.tasks[0].title, "Done thing");
    }

    #[tokio::test]
    async fn list_tasks_pagination() {
        let store = store().await;
        for i in 0..5 {
            store
                .insert_task("u1", &format!("Task {i}"), None)
                .await
                .unwrap();
        }

        let first = store.list_tasks("u1", TaskFilter::All, 2, 0).await.unwrap();
        assert_eq!(first.tasks.len(), 2);
        assert_eq!(first.total, 5);
        assert!(first.has_more);

        let last = store.list_tasks("u1", TaskFilter::All, 2, 4).await.unwrap();
        assert_eq!(last.tasks.len(), 1);
        assert!(!last.has_more);
    }

    #[tokio::test]
    async fn complete_task_is_idempotent() {
        let store = store().await;
        let task = store.insert_task("u1", "Buy milk", None).await.unwrap();

        let first = store.complete_task("u1", task.id).await.unwrap().unwrap();
        assert!(first.completed);

        let second = store.complete_task("u1", task.id).await.unwrap().unwrap();
        assert!(second.completed);
        assert_eq!(second.updated_at, first.updated_at);
    }

    #[tokio::test]
    async fn tasks_are_isolated_between_users() {
        let store = store().await;
        let task = store.insert_task("alice", "Secret", None).await.unwrap();

        assert!(store.complete_task("bob", task.id).await.unwrap().is_none());
        assert!(store.delete_task("bob", task.id).await.unwrap().is_none());
        assert!(store
            .update_task("bob", task.id, Some("Stolen"), None, None)
            .await
            .unwrap()
            .is_none());

        let page = store
            .list_tasks("bob", TaskFilter::All, 50, 0)
            .await
            .unwrap();
        assert_eq!(page.total, 0);

        // Alice's task unchanged
        let page = store
            .list_tasks("alice", TaskFilter::All, 50, 0)
            .await
            .unwrap();
        assert_eq!(page.tasks[0].title, "Secret");
    }

    #[tokio::test]
    async fn update_task_partial_fields() {
        let store = store().await;
        let task = store
            .insert_task("u1", "Buy milk", Some("2 liters"))
            .await
            .unwrap();

        let updated = store
            .update_task("u1", task.id, Some("Buy oat milk"), None, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Buy oat milk");
        assert_eq!(updated.description.as_deref(), Some("2 liters"));
        assert!(!updated.completed);

        let updated = store
            .update_task("u1", task.id, None, None, Some(true))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Buy oat milk");
        assert!(updated.completed);
    }

    #[tokio::test]
    async fn delete_task_returns_deleted_row() {
        let store = store().await;
        let task = store.insert_task("u1", "Buy milk", None).await.unwrap();

        let deleted = store.delete_task("u1", task.id).await.unwrap().unwrap();
        assert_eq!(deleted.id, task.id);

        let page = store
            .list_tasks("u1", TaskFilter::All, 50, 0)
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn commit_exchange_creates_conversation_and_messages() {
        let store = store().await;
        let conv_id = store
            .commit_exchange(None, "u1", "Add milk", "Added it.")
            .await
            .unwrap();

        let conv = store.get_conversation(conv_id, "u1").await.unwrap();
        assert_eq!(conv.user_id, "u1");

        let messages = store.recent_messages(conv_id, 20).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "Add milk");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "Added it.");
    }

    #[tokio::test]
    async fn commit_exchange_appends_to_existing_conversation() {
        let store = store().await;
        let conv_id = store
            .commit_exchange(None, "u1", "Add milk", "Added it.")
            .await
            .unwrap();
        let same = store
            .commit_exchange(Some(conv_id), "u1", "And eggs", "Also added.")
            .await
            .unwrap();
        assert_eq!(same, conv_id);

        let messages = store.recent_messages(conv_id, 20).await.unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[3].content, "Also added.");
    }

    #[tokio::test]
    async fn commit_exchange_rejects_foreign_conversation() {
        let store = store().await;
        let conv_id = store
            .commit_exchange(None, "alice", "hi", "hello")
            .await
            .unwrap();

        let err = store
            .commit_exchange(Some(conv_id), "bob", "hi", "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConversationForbidden(_)));

        // No rows leaked into alice's conversation.
        let messages = store.recent_messages(conv_id, 20).await.unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn commit_exchange_unknown_conversation() {
        let store = store().await;
        let err = store
            .commit_exchange(Some(999), "u1", "hi", "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConversationNotFound(999)));
    }

    #[tokio::test]
    async fn commit_exchange_rolls_back_on_failure() {
        let store = store().await;
        // The messages table rejects content over 10000 chars; the assistant
        // insert fails after the conversation and user rows were written.
        let oversized = "x".repeat(10_001);
        let err = store
            .commit_exchange(None, "u1", "hi", &oversized)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));

        let conversations = store.list_conversations("u1", 10).await.unwrap();
        assert!(conversations.is_empty());
    }

    #[tokio::test]
    async fn commit_exchange_rejects_empty_content() {
        let store = store().await;
        let err = store
            .commit_exchange(None, "u1", "hi", "")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));

        let conversations = store.list_conversations("u1", 10).await.unwrap();
        assert!(conversations.is_empty());
    }

    #[tokio::test]
    async fn recent_messages_keeps_latest_in_order() {
        let store = store().await;
        let conv_id = store.commit_exchange(None, "u1", "m1", "r1").await.unwrap();
        store
            .commit_exchange(Some(conv_id), "u1", "m2", "r2")
            .await
            .unwrap();
        store
            .commit_exchange(Some(conv_id), "u1", "m3", "r3")
            .await
            .unwrap();

        // 6 messages exist; asking for 4 must return the newest 4, oldest
        // first.
        let messages = store.recent_messages(conv_id, 4).await.unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "r2", "m3", "r3"]);
    }

    #[tokio::test]
    async fn get_conversation_distinguishes_missing_from_foreign() {
        let store = store().await;
        let conv_id = store
            .commit_exchange(None, "alice", "hi", "hello")
            .await
            .unwrap();

        let err = store.get_conversation(999, "alice").await.unwrap_err();
        assert!(matches!(err, StoreError::ConversationNotFound(999)));

        let err = store.get_conversation(conv_id, "bob").await.unwrap_err();
        assert!(matches!(err, StoreError::ConversationForbidden(_)));
    }

    #[tokio::test]
    async fn list_conversations_newest_first() {
        let store = store().await;
        let first = store.commit_exchange(None, "u1", "a", "b").await.unwrap();
        let second = store.commit_exchange(None, "u1", "c", "d").await.unwrap();
        store
            .commit_exchange(Some(first), "u1", "e", "f")
            .await
            .unwrap();

        let conversations = store.list_conversations("u1", 10).await.unwrap();
        assert_eq!(conversations.len(), 2);
        // `first` was touched last, so it sorts ahead of `second`.
        assert_eq!(conversations[0].id, first);
        assert_eq!(conversations[1].id, second);
    }
}
