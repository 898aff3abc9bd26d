//! `POST /analyze`: classify one message or a batch.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use serde::{Serialize, Serializer};
use serde_json::{Value, json};
use tracing::info;

use super::AppState;
use super::error::ApiError;
use crate::pipeline::analysis::Analysis;
use crate::pipeline::normalizer::normalize_value;
use crate::pipeline::types::NormalizedMessage;

pub const NO_MESSAGES: &str = "No messages provided for analysis";
pub const INVALID_BODY: &str = "Invalid request body. Expected \"message\" or \"messages\" field.";

/// `{messages: [...]}` → `{analysis: {id: Analysis}}`; `{message}` → `{analysis}`.
pub(super) async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;

    if let Some(messages) = body.get("messages").and_then(Value::as_array) {
        if messages.is_empty() {
            return Err(ApiError::bad_request(NO_MESSAGES));
        }
        let normalized = messages
            .iter()
            .map(normalize_value)
            .collect::<Result<Vec<NormalizedMessage>, _>>()?;
        let results = state.classifier.analyze_batch(&normalized).await;
        let body = BatchBody {
            analysis: ById(&results),
        };
        return Ok(Json(body).into_response());
    }

    if let Some(message) = body.get("message").filter(|v| is_truthy(v)) {
        let normalized = normalize_value(message)?;
        let analysis = state.classifier.analyze(&normalized).await?;
        info!(
            id = normalized.id.as_deref().unwrap_or("-"),
            priority = %analysis.priority,
            "Message analyzed"
        );
        return Ok(Json(json!({ "analysis": analysis })).into_response());
    }

    Err(ApiError::bad_request(INVALID_BODY))
}

#[derive(Serialize)]
struct BatchBody<'a> {
    analysis: ById<'a>,
}

/// `{id: Analysis}` with keys in batch order.
struct ById<'a>(&'a [(String, Analysis)]);

impl Serialize for ById<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(id, analysis)| (id, analysis)))
    }
}

fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}
