//! Configuration types.
//!
//! Everything is read from environment variables once at startup. Defaults:
//! batch calls run one at a time with 500ms after each, no retries, and
//! classifier failures degrade.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::integrations::{DEFAULT_GMAIL_BASE_URL, DEFAULT_SLACK_BASE_URL};
use crate::llm::retry::RetryPolicy;
use crate::llm::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, LlmConfig};
use crate::pipeline::classifier::{ClassifierConfig, FailurePolicy};

/// Default HTTP port.
const DEFAULT_PORT: u16 = 8080;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the HTTP API listens on.
    pub port: u16,
    /// Seed the task store with the sample tasks on startup.
    pub seed_sample_tasks: bool,
    /// Directory for a daily-rolling log file (stderr only when unset).
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            seed_sample_tasks: true,
            log_dir: None,
        }
    }
}

/// Base URLs for the message-source APIs.
#[derive(Debug, Clone)]
pub struct IntegrationConfig {
    pub gmail_base_url: String,
    pub slack_base_url: String,
    /// Optional per-request timeout for outbound HTTP calls.
    pub http_timeout: Option<Duration>,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            gmail_base_url: DEFAULT_GMAIL_BASE_URL.to_string(),
            slack_base_url: DEFAULT_SLACK_BASE_URL.to_string(),
            http_timeout: None,
        }
    }
}

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct FlowSyncConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub classifier: ClassifierConfig,
    pub integrations: IntegrationConfig,
}

impl FlowSyncConfig {
    /// Build the configuration from environment variables.
    ///
    /// `GEMINI_API_KEY` is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let http_timeout = parse_env::<u64>("FLOWSYNC_HTTP_TIMEOUT_SECS")?.map(Duration::from_secs);

        let llm = LlmConfig {
            api_key: SecretString::from(api_key),
            model: std::env::var("FLOWSYNC_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: std::env::var("FLOWSYNC_GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            timeout: http_timeout,
        };

        let defaults = ClassifierConfig::default();
        let classifier = ClassifierConfig {
            temperature: parse_env("FLOWSYNC_TEMPERATURE")?.unwrap_or(defaults.temperature),
            max_output_tokens: parse_env("FLOWSYNC_MAX_OUTPUT_TOKENS")?
                .unwrap_or(defaults.max_output_tokens),
            json_output: parse_env("FLOWSYNC_STRUCTURED_OUTPUT")?.unwrap_or(defaults.json_output),
            failure_policy: parse_env("FLOWSYNC_FAILURE_POLICY")?
                .unwrap_or(defaults.failure_policy),
            retry: RetryPolicy {
                max_retries: parse_env("FLOWSYNC_MAX_RETRIES")?
                    .unwrap_or(defaults.retry.max_retries),
                ..defaults.retry
            },
            batch_interval: parse_env::<u64>("FLOWSYNC_BATCH_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.batch_interval),
            batch_concurrency: parse_env::<usize>("FLOWSYNC_BATCH_CONCURRENCY")?
                .unwrap_or(defaults.batch_concurrency)
                .max(1),
        };

        let server = ServerConfig {
            port: parse_env("FLOWSYNC_PORT")?.unwrap_or(DEFAULT_PORT),
            seed_sample_tasks: parse_env("FLOWSYNC_SEED_SAMPLE_TASKS")?.unwrap_or(true),
            log_dir: std::env::var("FLOWSYNC_LOG_DIR").ok().map(PathBuf::from),
        };

        let integrations = IntegrationConfig {
            gmail_base_url: std::env::var("FLOWSYNC_GMAIL_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GMAIL_BASE_URL.to_string()),
            slack_base_url: std::env::var("FLOWSYNC_SLACK_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_SLACK_BASE_URL.to_string()),
            http_timeout,
        };

        Ok(Self {
            server,
            llm,
            classifier,
            integrations,
        })
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(Self::Degrade),
            "propagate" => Ok(Self::Propagate),
            other => Err(format!("expected 'degrade' or 'propagate', got '{other}'")),
        }
    }
}

/// Read and parse an optional environment variable.
///
/// Unset or empty → `Ok(None)`; set but unparseable → `InvalidValue`.
fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => parse_value(key, &raw).map(Some),
        _ => Ok(None),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        })
}
