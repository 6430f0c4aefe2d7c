//! SQLite persistence for conversations, messages, and tasks.

pub mod sqlite;

pub use sqlite::SqliteStore;
