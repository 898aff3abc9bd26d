//! Slack Web API: recent messages across the first few channels.

use std::cmp::Reverse;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use tracing::{info, warn};

use super::{MessageFetcher, check_status, http_client, trim_base};
use crate::error::IntegrationError;
use crate::pipeline::normalizer::parse_chat_ts;
use crate::pipeline::types::{ChatRecord, RawMessage};

const SERVICE: &str = "slack";

/// Channels read per fetch, to stay under Slack's tier limits.
const MAX_CHANNELS: usize = 5;

const UNKNOWN_CHANNEL: &str = "Unknown Channel";

// ── API response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Debug, Clone, Deserialize)]
struct Channel {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Vec<SlackMessage>,
}

#[derive(Debug, Deserialize)]
struct SlackMessage {
    ts: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
}

/// Slack reports most failures as HTTP 200 with `ok: false`.
fn api_error(error: Option<String>) -> IntegrationError {
    match error.as_deref() {
        Some("not_authed" | "invalid_auth" | "token_revoked" | "token_expired") => {
            IntegrationError::Unauthorized {
                service: SERVICE.to_string(),
            }
        }
        _ => IntegrationError::Api {
            service: SERVICE.to_string(),
            status: 200,
            message: error.unwrap_or_else(|| "unknown_error".to_string()),
        },
    }
}

// ── Fetcher ─────────────────────────────────────────────────────────

/// Slack channel-history fetcher.
pub struct SlackFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl SlackFetcher {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, IntegrationError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: trim_base(base_url),
        })
    }

    async fn list_channels(&self, token: &str) -> Result<Vec<Channel>, IntegrationError> {
        let resp = self
            .client
            .get(format!("{}/conversations.list", self.base_url))
            .bearer_auth(token)
            .query(&[
                ("types", "public_channel,private_channel"),
                ("exclude_archived", "true"),
                ("limit", "100"),
            ])
            .send()
            .await?;
        let list: ChannelListResponse = check_status(SERVICE, resp).await?.json().await?;
        if !list.ok {
            return Err(api_error(list.error));
        }
        Ok(list.channels)
    }

    async fn channel_history(
        &self,
        token: &str,
        channel: &Channel,
        limit: usize,
    ) -> Result<Vec<RawMessage>, IntegrationError> {
        let limit = limit.to_string();
        let resp = self
            .client
            .get(format!("{}/conversations.history", self.base_url))
            .bearer_auth(token)
            .query(&[("channel", channel.id.as_str()), ("limit", limit.as_str())])
            .send()
            .await?;
        let history: HistoryResponse = check_status(SERVICE, resp).await?.json().await?;
        if !history.ok {
            return Err(api_error(history.error));
        }

        let channel_name = channel
            .name
            .clone()
            .unwrap_or_else(|| UNKNOWN_CHANNEL.to_string());

        Ok(history
            .messages
            .into_iter()
            .map(|m| {
                RawMessage::Chat(ChatRecord {
                    id: Some(m.ts.clone()),
                    channel_id: Some(channel.id.clone()),
                    channel_name: Some(channel_name.clone()),
                    user_id: m.user,
                    text: m.text,
                    thread_ts: Some(m.thread_ts.unwrap_or_else(|| m.ts.clone())),
                    ts: Some(m.ts),
                    date: None,
                })
            })
            .collect())
    }
}

#[async_trait]
impl MessageFetcher for SlackFetcher {
    fn service(&self) -> &'static str {
        SERVICE
    }

    /// History from the first five channels, `ceil(limit / channels)` each,
    /// newest first and truncated to `limit`. A failing channel is skipped.
    async fn fetch(&self, token: &str, limit: usize) -> Result<Vec<RawMessage>, IntegrationError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut channels = self.list_channels(token).await?;
        channels.truncate(MAX_CHANNELS);
        if channels.is_empty() {
            return Ok(Vec::new());
        }

        let per_channel = limit.div_ceil(channels.len());
        let results = join_all(
            channels
                .iter()
                .map(|channel| self.channel_history(token, channel, per_channel)),
        )
        .await;

        let mut messages = Vec::new();
        for (channel, result) in channels.iter().zip(results) {
            match result {
                Ok(batch) => messages.extend(batch),
                Err(e) => warn!(channel = %channel.id, error = %e, "Skipping channel"),
            }
        }

        sort_newest_first(&mut messages);
        messages.truncate(limit);
        info!(count = messages.len(), "Fetched Slack messages");
        Ok(messages)
    }
}

/// Unparseable timestamps sort last.
fn sort_newest_first(messages: &mut [RawMessage]) {
    messages.sort_by_key(|m| {
        let at = match m {
            RawMessage::Chat(c) => c.ts.as_deref().and_then(parse_chat_ts),
            RawMessage::Email(_) => None,
        };
        Reverse(at)
    });
}
