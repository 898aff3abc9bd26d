//! `GET /messages/email` and `GET /messages/slack`.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::AppState;
use super::error::ApiError;
use crate::error::IntegrationError;
use crate::integrations::MessageFetcher;
use crate::pipeline::types::RawMessage;

const DEFAULT_LIMIT: usize = 10;
const SLACK_COOKIE: &str = "slack_token";

#[derive(Debug, Deserialize)]
pub(super) struct LimitQuery {
    limit: Option<usize>,
}

pub(super) async fn list_emails(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(LimitQuery { limit }) = query?;
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("You must be signed in to access emails"))?;

    let emails = fetch_recent(state.email.as_ref(), token, limit, "Failed to fetch emails").await?;
    Ok(Json(json!({ "emails": emails })))
}

pub(super) async fn list_slack_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(LimitQuery { limit }) = query?;
    let token = cookie(&headers, SLACK_COOKIE)
        .ok_or_else(|| ApiError::unauthorized("Slack authentication required"))?;

    let messages =
        fetch_recent(state.chat.as_ref(), token, limit, "Failed to fetch Slack messages").await?;
    Ok(Json(json!({ "messages": messages })))
}

async fn fetch_recent(
    fetcher: &dyn MessageFetcher,
    token: &str,
    limit: Option<usize>,
    failure_message: &str,
) -> Result<Vec<RawMessage>, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    let messages = fetcher
        .fetch(token, limit)
        .await
        .map_err(|e| fetch_error(e, failure_message))?;
    info!(
        service = fetcher.service(),
        limit,
        count = messages.len(),
        "Fetched recent messages"
    );
    Ok(messages)
}

fn fetch_error(e: IntegrationError, message: &str) -> ApiError {
    match e {
        IntegrationError::Unauthorized { .. } => ApiError::unauthorized(e.to_string()),
        other => ApiError::internal(message, other),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|v| !v.is_empty())
}
