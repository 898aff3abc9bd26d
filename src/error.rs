//! Error types for FlowSync.

use std::time::Duration;

/// Errors raised while wiring up the service.
///
/// Request-time failures stay in their own enums and are mapped to HTTP
/// responses in `api::error`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Integration error: {0}")]
    Integration(#[from] IntegrationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether a retry has any chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RequestFailed { .. } | Self::RateLimited { .. })
    }

    /// Server-suggested wait before retrying, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Failures inside the priority classifier.
///
/// Under the default failure policy these never leave the classifier: they are
/// logged and replaced by a degraded `Analysis`.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("no JSON found")]
    NoJson,

    #[error("output truncated at the token limit")]
    Truncated,

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("provider call failed: {0}")]
    Provider(#[from] LlmError),
}

/// A value could not be read as a raw message at all.
///
/// The normalizer itself never fails; missing fields are repaired with
/// placeholders. This is only raised when the input is not a message shape.
#[derive(Debug, thiserror::Error)]
pub enum NormalizationError {
    #[error("Malformed raw message: {0}")]
    Malformed(String),
}

/// Errors from the Gmail / Slack fetchers.
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} rejected the access token")]
    Unauthorized { service: String },

    #[error("{service} API error {status}: {message}")]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Task store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Task not found: {id}")]
    NotFound { id: String },

    #[error("Task {id} version conflict: expected {expected}, found {actual}")]
    Conflict {
        id: String,
        expected: u64,
        actual: u64,
    },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
