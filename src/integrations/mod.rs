//! Message-source integrations over plain REST.
//!
//! Each fetcher takes a caller-supplied access token; acquiring and
//! refreshing tokens is the caller's job.
//!
//! Modules:
//! - gmail: Gmail API v1 inbox listing and full-message bodies
//! - slack: Slack Web API channel history

pub mod gmail;
pub mod slack;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::IntegrationError;
use crate::pipeline::types::RawMessage;

pub use gmail::GmailFetcher;
pub use slack::SlackFetcher;

pub const DEFAULT_GMAIL_BASE_URL: &str = "https://gmail.googleapis.com";
pub const DEFAULT_SLACK_BASE_URL: &str = "https://slack.com/api";

/// Fetches recent messages from one provider.
#[async_trait]
pub trait MessageFetcher: Send + Sync {
    /// Provider name used in logs and errors.
    fn service(&self) -> &'static str;

    /// Up to `limit` recent messages visible to `token`.
    async fn fetch(&self, token: &str, limit: usize) -> Result<Vec<RawMessage>, IntegrationError>;
}

/// Shared client builder for the fetchers.
pub(crate) fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client, IntegrationError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Map 401 to `Unauthorized` and any other non-2xx to `Api`.
pub(crate) async fn check_status(
    service: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, IntegrationError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(IntegrationError::Unauthorized {
            service: service.to_string(),
        });
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(IntegrationError::Api {
            service: service.to_string(),
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(resp)
}

fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
