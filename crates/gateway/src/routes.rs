//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `POST /v1/chat`                        — Send a message, get a response
//! - `GET  /v1/conversations`               — List the user's conversations
//! - `GET  /v1/conversations/{id}/messages` — Messages of one conversation
//! - `GET  /v1/tools`                       — List available tools
//! - `GET  /v1/health`                      — Liveness probe
//!
//! Every endpoint except `/v1/health` requires a bearer token. Error bodies
//! never leak internals; a conversation the caller does not own is reported
//! with the exact same 404 body as one that does not exist.

use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{AuthResolver, authenticate};
use taskpilot_agent::Orchestrator;
use taskpilot_core::error::OrchestratorError;
use taskpilot_core::provider::ToolDefinition;
use taskpilot_core::store::{ConversationStore, RateLimiter};

// ── State ──

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub conversations: Arc<dyn ConversationStore>,
    pub limiter: Arc<dyn RateLimiter>,
    pub auth: Arc<dyn AuthResolver>,
    pub tools: Vec<ToolDefinition>,
}

pub type SharedState = Arc<AppState>;

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/conversations", get(list_conversations_handler))
        .route(
            "/conversations/{id}/messages",
            get(conversation_messages_handler),
        )
        .route("/tools", get(list_tools_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

// ── Request / Response types ──

#[derive(Deserialize)]
struct ChatRequest {
    /// Existing conversation ID (omit to start a new conversation).
    #[serde(default)]
    conversation_id: Option<i64>,
    /// The user's message.
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    conversation_id: i64,
    response: String,
    tool_calls: Vec<ToolCallDto>,
}

#[derive(Serialize)]
struct ToolCallDto {
    tool: String,
    success: bool,
}

#[derive(Serialize)]
struct ConversationListResponse {
    conversations: Vec<ConversationDto>,
}

#[derive(Serialize)]
struct ConversationDto {
    id: i64,
    created_at: String,
    updated_at: String,
}

#[derive(Serialize)]
struct MessageListResponse {
    conversation_id: i64,
    messages: Vec<MessageDto>,
}

#[derive(Serialize)]
struct MessageDto {
    id: i64,
    role: String,
    content: String,
    created_at: String,
}

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolDefinition>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

// ── Error mapping ──

struct ApiError {
    status: StatusCode,
    body: ErrorBody,
    retry_after_secs: Option<u64>,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error,
                message: message.into(),
            },
            retry_after_secs: None,
        }
    }

    fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "A valid bearer token is required.",
        )
    }

}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(secs) = self.retry_after_secs {
            if let Ok(value) = secs.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        // The body's `error` tag is keyed off the status, not the variant,
        // so a forbidden conversation serializes byte-identically to a
        // missing one.
        let (status, tag) = match &err {
            OrchestratorError::InputValidation(_) => {
                (StatusCode::BAD_REQUEST, "input_validation")
            }
            OrchestratorError::ConversationNotFound(_)
            | OrchestratorError::ConversationForbidden(_) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            OrchestratorError::RateLimitExceeded { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded")
            }
            OrchestratorError::UpstreamModel(_) => (StatusCode::BAD_GATEWAY, "upstream_model"),
            OrchestratorError::Persistence(_) | OrchestratorError::RequestTimeout => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };

        if status.is_server_error() {
            warn!(category = err.category(), error = %err, "Request failed");
        }

        let retry_after_secs = match &err {
            OrchestratorError::RateLimitExceeded { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        ApiError {
            status,
            body: ErrorBody {
                error: tag,
                message: err.user_message().to_string(),
            },
            retry_after_secs,
        }
    }
}

// ── Handlers ──

fn require_user(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    authenticate(state.auth.as_ref(), headers).ok_or_else(ApiError::unauthorized)
}

async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let user_id = require_user(&state, &headers)?;

    if let Err(limited) = state.limiter.check(&user_id) {
        info!(window = limited.window, "Rate limit hit");
        return Err(OrchestratorError::RateLimitExceeded {
            retry_after_secs: limited.retry_after_secs,
        }
        .into());
    }

    let outcome = state
        .orchestrator
        .process_message(&user_id, payload.conversation_id, &payload.message)
        .await?;

    Ok(Json(ChatResponse {
        conversation_id: outcome.conversation_id,
        response: outcome.response_text,
        tool_calls: outcome
            .tool_calls
            .iter()
            .map(|r| ToolCallDto {
                tool: r.tool.clone(),
                success: r.outcome.success,
            })
            .collect(),
    }))
}

async fn list_conversations_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<ConversationListResponse>, ApiError> {
    let user_id = require_user(&state, &headers)?;

    let conversations = state
        .conversations
        .list_conversations(&user_id, 50)
        .await
        .map_err(|e| ApiError::from(OrchestratorError::from(e)))?;

    Ok(Json(ConversationListResponse {
        conversations: conversations
            .iter()
            .map(|c| ConversationDto {
                id: c.id,
                created_at: c.created_at.to_rfc3339(),
                updated_at: c.updated_at.to_rfc3339(),
            })
            .collect(),
    }))
}

async fn conversation_messages_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let user_id = require_user(&state, &headers)?;

    // Ownership check first; a foreign conversation 404s without reading
    // any messages.
    state
        .conversations
        .get_conversation(id, &user_id)
        .await
        .map_err(|e| ApiError::from(OrchestratorError::from(e)))?;

    let messages = state
        .conversations
        .recent_messages(id, 100)
        .await
        .map_err(|e| ApiError::from(OrchestratorError::from(e)))?;

    Ok(Json(MessageListResponse {
        conversation_id: id,
        messages: messages
            .iter()
            .map(|m| MessageDto {
                id: m.id,
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
                created_at: m.created_at.to_rfc3339(),
            })
            .collect(),
    }))
}

async fn list_tools_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<ToolListResponse>, ApiError> {
    require_user(&state, &headers)?;
    Ok(Json(ToolListResponse {
        tools: state.tools.clone(),
    }))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::OpaqueTokenAuth;
    use crate::rate_limit::SlidingWindowLimiter;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use taskpilot_agent::{AgentLoop, ContextAssembler, ToolDispatcher};
    use taskpilot_core::error::ProviderError;
    use taskpilot_core::message::ChatMessage;
    use taskpilot_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use taskpilot_store::SqliteStore;
    use tower::ServiceExt;

    struct CannedProvider;

    #[async_trait]
    impl Provider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: ChatMessage::assistant("Done!"),
                usage: None,
                model: "canned".into(),
            })
        }
    }

    async fn router() -> (Arc<SqliteStore>, Router) {
        let store = Arc::new(
            SqliteStore::new(":memory:", Duration::from_secs(5))
                .await
                .unwrap(),
        );
        let registry = Arc::new(taskpilot_tools::registry(store.clone()));
        let tools = registry.definitions();
        let dispatcher = ToolDispatcher::new(registry, Duration::from_secs(10));
        let agent = AgentLoop::new(Arc::new(CannedProvider), "canned", 0.0, dispatcher, 5);
        let orchestrator = Arc::new(Orchestrator::new(
            ContextAssembler::new(20, 4000, 500),
            agent,
            store.clone(),
            Duration::from_secs(45),
        ));

        let state = Arc::new(AppState {
            orchestrator,
            conversations: store.clone(),
            limiter: Arc::new(SlidingWindowLimiter::new(20, 100)),
            auth: Arc::new(OpaqueTokenAuth),
            tools,
        });
        (store, Router::new().nest("/v1", v1_router(state)))
    }

    fn post_chat(token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/v1/chat")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_req(token: Option<&str>, uri: &str) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_requires_no_auth() {
        let (_store, app) = router().await;
        let response = app.oneshot(get_req(None, "/v1/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn chat_requires_auth() {
        let (_store, app) = router().await;
        let response = app
            .oneshot(post_chat(None, serde_json::json!({"message": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn chat_round_trip() {
        let (store, app) = router().await;
        let response = app
            .oneshot(post_chat(
                Some("u1"),
                serde_json::json!({"message": "Add milk"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["response"], "Done!");
        let conv_id = body["conversation_id"].as_i64().unwrap();

        let messages = store.recent_messages(conv_id, 10).await.unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn empty_message_is_bad_request() {
        let (_store, app) = router().await;
        let response = app
            .oneshot(post_chat(Some("u1"), serde_json::json!({"message": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "input_validation");
    }

    #[tokio::test]
    async fn foreign_and_missing_conversations_get_identical_404s() {
        let (store, app) = router().await;
        let conv_id = store
            .commit_exchange(None, "alice", "hi", "hello")
            .await
            .unwrap();

        let foreign = app
            .clone()
            .oneshot(get_req(
                Some("bob"),
                &format!("/v1/conversations/{conv_id}/messages"),
            ))
            .await
            .unwrap();
        let missing = app
            .oneshot(get_req(Some("bob"), "/v1/conversations/999999/messages"))
            .await
            .unwrap();

        assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(foreign).await, body_json(missing).await);
    }

    #[tokio::test]
    async fn conversations_are_listed_per_user() {
        let (store, app) = router().await;
        store
            .commit_exchange(None, "alice", "hi", "hello")
            .await
            .unwrap();

        let response = app
            .oneshot(get_req(Some("bob"), "/v1/conversations"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["conversations"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn rate_limit_returns_429_with_retry_after() {
        let (store, _) = router().await;
        // A dedicated router with a tiny limit.
        let registry = Arc::new(taskpilot_tools::registry(store.clone()));
        let tools = registry.definitions();
        let dispatcher = ToolDispatcher::new(registry, Duration::from_secs(10));
        let agent = AgentLoop::new(Arc::new(CannedProvider), "canned", 0.0, dispatcher, 5);
        let orchestrator = Arc::new(Orchestrator::new(
            ContextAssembler::new(20, 4000, 500),
            agent,
            store.clone(),
            Duration::from_secs(45),
        ));
        let state = Arc::new(AppState {
            orchestrator,
            conversations: store,
            limiter: Arc::new(SlidingWindowLimiter::new(1, 100)),
            auth: Arc::new(OpaqueTokenAuth),
            tools,
        });
        let app = Router::new().nest("/v1", v1_router(state));

        let ok = app
            .clone()
            .oneshot(post_chat(Some("u1"), serde_json::json!({"message": "hi"})))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let limited = app
            .oneshot(post_chat(Some("u1"), serde_json::json!({"message": "hi"})))
            .await
            .unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(limited.headers().contains_key("Retry-After"));
    }

    #[tokio::test]
    async fn tools_endpoint_lists_the_closed_set() {
        let (_store, app) = router().await;
        let response = app
            .oneshot(get_req(Some("u1"), "/v1/tools"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["tools"].as_array().unwrap().len(), 5);
    }
}
