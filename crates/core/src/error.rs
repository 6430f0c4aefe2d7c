//! Error types for the taskpilot domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each bounded context
//! (store, provider, tools) has its own error enum; inner components return
//! these typed results up the call chain, and they are converted into the
//! single `OrchestratorError` taxonomy only at the orchestrator boundary.
//! Tool-level failures never appear in `OrchestratorError`: they are
//! recovered inside the agent loop as structured tool outcomes the model can
//! react to.

use thiserror::Error;

/// Errors from the conversation/task stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conversation {0} not found")]
    ConversationNotFound(i64),

    /// The conversation exists but belongs to another user. Callers must not
    /// reveal existence: surface this identically to `ConversationNotFound`.
    #[error("conversation {0} does not belong to the requesting user")]
    ConversationForbidden(i64),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("query timed out after {0}s")]
    Timeout(u64),
}

/// Errors from the LLM provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Whether a single retry with the same context is worthwhile.
    /// Only timeouts are retried; everything else fails fast.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Timeout(_))
    }
}

/// Errors from tool dispatch and execution.
///
/// These never terminate a request on their own: the dispatcher folds them
/// into structured error outcomes that flow back into the model's context.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("tool storage error: {0}")]
    Store(#[from] StoreError),
}

/// The request-level error taxonomy, produced only at the orchestrator
/// boundary. Every variant terminates the request; the caller maps it to a
/// transport code and shows the user a short non-leaking fallback message.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("conversation {0} not found")]
    ConversationNotFound(i64),

    #[error("access to conversation {0} denied")]
    ConversationForbidden(i64),

    #[error("model provider error: {0}")]
    UpstreamModel(#[from] ProviderError),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("request timed out")]
    RequestTimeout,
}

impl OrchestratorError {
    /// Short category tag for logs and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            OrchestratorError::InputValidation(_) => "input_validation",
            OrchestratorError::ConversationNotFound(_) => "conversation_not_found",
            OrchestratorError::ConversationForbidden(_) => "conversation_forbidden",
            OrchestratorError::UpstreamModel(_) => "upstream_model",
            OrchestratorError::Persistence(_) => "persistence",
            OrchestratorError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            OrchestratorError::RequestTimeout => "request_timeout",
        }
    }

    /// The orchestrator-authored message shown to the user for terminal
    /// failures. Never includes internals, identifiers, or model output.
    pub fn user_message(&self) -> &'static str {
        match self {
            OrchestratorError::InputValidation(_) => {
                "Your message must be between 1 and 10,000 characters."
            }
            OrchestratorError::ConversationNotFound(_)
            | OrchestratorError::ConversationForbidden(_) => "Conversation not found.",
            OrchestratorError::RateLimitExceeded { .. } => {
                "You're sending messages too quickly. Please wait a moment and try again."
            }
            OrchestratorError::UpstreamModel(_) | OrchestratorError::RequestTimeout => {
                "I'm having trouble responding right now. Please try again in a moment."
            }
            OrchestratorError::Persistence(_) => "Something went wrong, please try again.",
        }
    }
}

impl From<StoreError> for OrchestratorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConversationNotFound(id) => OrchestratorError::ConversationNotFound(id),
            StoreError::ConversationForbidden(id) => OrchestratorError::ConversationForbidden(id),
            other => OrchestratorError::Persistence(other.to_string()),
        }
    }
}
