//! Context assembly, the bounded agent loop, and request orchestration.
//!
//! One chat request flows through this crate top to bottom:
//!
//! 1. [`context::ContextAssembler`] loads history and builds the token-bounded
//!    context window.
//! 2. [`loop_runner::AgentLoop`] alternates model calls and tool dispatch
//!    until the model produces a plain text answer (or the tool-call bound
//!    forces one).
//! 3. [`orchestrator::Orchestrator`] wraps both, validates input, persists
//!    the completed exchange, and enforces the end-to-end request timeout.

pub mod context;
pub mod dispatch;
pub mod loop_runner;
pub mod orchestrator;
pub mod prompt;
pub mod token;

pub use context::{AssembledContext, ContextAssembler};
pub use dispatch::ToolDispatcher;
pub use loop_runner::{AgentLoop, LoopOutcome};
pub use orchestrator::{ChatOutcome, Orchestrator};
