//! # taskpilot Core
//!
//! Domain types, traits, and error definitions for the taskpilot
//! conversational todo orchestrator. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here: the LLM backend
//! (`Provider`), durable storage (`ConversationStore`, `TaskStore`), and the
//! request gate (`RateLimiter`). Implementations live in their respective
//! crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{OrchestratorError, ProviderError, StoreError, ToolError};
pub use message::{ChatMessage, ChatRole, Conversation, Role, StoredMessage};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use store::{
    ConversationStore, RateLimited, RateLimiter, Task, TaskFilter, TaskPage, TaskStore,
};
pub use tool::{TaskTool, ToolCallRecord, ToolKind, ToolOutcome, ToolRegistry};
