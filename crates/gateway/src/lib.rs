//! HTTP API gateway for TaskPilot.
//!
//! Exposes the v1 REST API: chat, conversation history, tool listing,
//! and a health probe. Built on Axum.

pub mod auth;
pub mod rate_limit;
pub mod routes;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use taskpilot_agent::{AgentLoop, ContextAssembler, Orchestrator, ToolDispatcher};
use taskpilot_config::AppConfig;
use taskpilot_providers::OpenAiCompatProvider;
use taskpilot_store::SqliteStore;

pub use auth::{AuthResolver, OpaqueTokenAuth};
pub use rate_limit::SlidingWindowLimiter;
pub use routes::{AppState, SharedState, v1_router};

/// Build the full router: v1 API plus cross-cutting layers.
pub fn build_router(state: SharedState, cors_origins: &[String]) -> Router {
    let mut origins: Vec<axum::http::HeaderValue> = Vec::new();
    for origin in cors_origins {
        match origin.parse() {
            Ok(value) => origins.push(value),
            Err(_) => warn!(origin = %origin, "Ignoring unparseable CORS origin"),
        }
    }

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .nest("/v1", v1_router(state))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Wire every subsystem from config and return the shared state.
pub async fn build_state(config: &AppConfig) -> Result<SharedState, Box<dyn std::error::Error>> {
    let api_key = config
        .api_key
        .clone()
        .ok_or("No API key configured. Set TASKPILOT_API_KEY or api_key in taskpilot.toml.")?;

    let store = Arc::new(
        SqliteStore::new(
            &config.database_url,
            Duration::from_secs(config.timeouts.db_secs),
        )
        .await?,
    );

    let provider = Arc::new(OpenAiCompatProvider::new(
        "openai",
        &config.api_url,
        api_key,
        Duration::from_secs(config.timeouts.model_secs),
    )?);

    let registry = Arc::new(taskpilot_tools::registry(store.clone()));
    let tools = registry.definitions();

    let dispatcher = ToolDispatcher::new(registry, Duration::from_secs(config.timeouts.tool_secs));
    let agent = AgentLoop::new(
        provider,
        &config.model,
        config.temperature,
        dispatcher,
        config.agent.max_tool_calls,
    );
    let assembler = ContextAssembler::new(
        config.context.max_history,
        config.context.max_context_tokens,
        config.context.response_headroom_tokens,
    );
    let orchestrator = Arc::new(Orchestrator::new(
        assembler,
        agent,
        store.clone(),
        Duration::from_secs(config.timeouts.request_secs),
    ));

    Ok(Arc::new(AppState {
        orchestrator,
        conversations: store,
        limiter: Arc::new(SlidingWindowLimiter::new(
            config.rate_limit.per_minute,
            config.rate_limit.per_hour,
        )),
        auth: Arc::new(OpaqueTokenAuth),
        tools,
    }))
}

/// Start the gateway HTTP server and run until shutdown.
pub async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = build_state(&config).await?;
    let app = build_router(state, &config.gateway.cors_origins);

    info!(addr = %addr, model = %config.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
