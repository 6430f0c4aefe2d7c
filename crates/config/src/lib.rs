//! Configuration loading, validation, and management for TaskPilot.
//!
//! Loads configuration from a TOML file with `TASKPILOT_*` environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `taskpilot.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model to use for every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Sqlite database URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Context window assembly settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Operation timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Per-user rate limits
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_database_url() -> String {
    "sqlite://taskpilot.db".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("database_url", &self.database_url)
            .field("context", &self.context)
            .field("agent", &self.agent)
            .field("timeouts", &self.timeouts)
            .field("rate_limit", &self.rate_limit)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Settings for context window assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum number of prior messages loaded per request
    #[serde(default = "default_max_history")]
    pub max_history: u32,

    /// Token budget for the assembled context window
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: u32,

    /// Tokens reserved for the model's response
    #[serde(default = "default_response_headroom")]
    pub response_headroom_tokens: u32,
}

fn default_max_history() -> u32 {
    20
}
fn default_max_context_tokens() -> u32 {
    4000
}
fn default_response_headroom() -> u32 {
    500
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            max_context_tokens: default_max_context_tokens(),
            response_headroom_tokens: default_response_headroom(),
        }
    }
}

/// Settings for the agent loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum number of tool-calling model turns per request
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,
}

fn default_max_tool_calls() -> u32 {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: default_max_tool_calls(),
        }
    }
}

/// Timeouts for all outbound operations, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// End-to-end budget for one chat request
    #[serde(default = "default_request_timeout")]
    pub request_secs: u64,

    /// Budget for one model call
    #[serde(default = "default_model_timeout")]
    pub model_secs: u64,

    /// Budget for one tool execution
    #[serde(default = "default_tool_timeout")]
    pub tool_secs: u64,

    /// Budget for one database query
    #[serde(default = "default_db_timeout")]
    pub db_secs: u64,
}

fn default_request_timeout() -> u64 {
    45
}
fn default_model_timeout() -> u64 {
    30
}
fn default_tool_timeout() -> u64 {
    10
}
fn default_db_timeout() -> u64 {
    5
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: default_request_timeout(),
            model_secs: default_model_timeout(),
            tool_secs: default_tool_timeout(),
            db_secs: default_db_timeout(),
        }
    }
}

/// Per-user request rate limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,

    #[serde(default = "default_per_hour")]
    pub per_hour: u32,
}

fn default_per_minute() -> u32 {
    20
}
fn default_per_hour() -> u32 {
    100
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_minute: default_per_minute(),
            per_hour: default_per_hour(),
        }
    }
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. Empty = same-origin only.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (`taskpilot.toml` in the
    /// working directory, or `TASKPILOT_CONFIG` if set).
    ///
    /// Environment variable overrides, applied after file loading:
    /// - `TASKPILOT_API_KEY` (falls back to `OPENAI_API_KEY`)
    /// - `TASKPILOT_MODEL`
    /// - `TASKPILOT_API_URL`
    /// - `TASKPILOT_DATABASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("TASKPILOT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("taskpilot.toml"));
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("TASKPILOT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("TASKPILOT_MODEL") {
            config.model = model;
        }

        if let Ok(url) = std::env::var("TASKPILOT_API_URL") {
            config.api_url = url;
        }

        if let Ok(url) = std::env::var("TASKPILOT_DATABASE_URL") {
            config.database_url = url;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_tool_calls == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_calls must be at least 1".into(),
            ));
        }

        if self.context.response_headroom_tokens >= self.context.max_context_tokens {
            return Err(ConfigError::ValidationError(
                "context.response_headroom_tokens must be smaller than max_context_tokens".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            database_url: default_database_url(),
            context: ContextConfig::default(),
            agent: AgentConfig::default(),
            timeouts: TimeoutConfig::default(),
            rate_limit: RateLimitConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.context.max_history, 20);
        assert_eq!(config.context.max_context_tokens, 4000);
        assert_eq!(config.agent.max_tool_calls, 5);
        assert_eq!(config.timeouts.request_secs, 45);
        assert_eq!(config.rate_limit.per_minute, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.timeouts.model_secs, config.timeouts.model_secs);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_tool_calls_rejected() {
        let config = AppConfig {
            agent: AgentConfig { max_tool_calls: 0 },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn headroom_must_fit_inside_budget() {
        let config = AppConfig {
            context: ContextConfig {
                max_context_tokens: 400,
                response_headroom_tokens: 400,
                ..ContextConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/taskpilot.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().model, "gpt-4o-mini");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let toml_str = r#"
model = "gpt-4o"

[context]
max_history = 10
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.context.max_history, 10);
        assert_eq!(config.context.max_context_tokens, 4000);
        assert_eq!(config.rate_limit.per_hour, 100);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
