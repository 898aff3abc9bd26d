//! `GET /briefing` and `POST /briefing`.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use crate::briefing::composer::compose;
use crate::briefing::delivery::DeliveryReceipt;
use crate::briefing::sample::sample_messages;
use crate::tasks::model::TaskFilter;

pub const TEXT_REQUIRED: &str = "Briefing text is required for audio conversion";

/// A freshly composed briefing over the demo messages and the stored tasks.
pub(super) async fn get_briefing(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let tasks = state.tasks.list(&TaskFilter::default()).await?;
    let briefing = compose(&sample_messages(Utc::now()), &tasks);
    Ok(Json(json!({ "briefing": briefing })))
}

/// Hand `{text}` to the delivery backend.
pub(super) async fn deliver_briefing(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<DeliveryReceipt>, ApiError> {
    let Json(body) = payload?;
    let text = body
        .get("text")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request(TEXT_REQUIRED))?;

    let receipt = state.delivery.deliver(text).await.map_err(|e| {
        ApiError::internal("Failed to generate audio briefing", e)
    })?;

    if !receipt.success {
        return Err(ApiError::new(StatusCode::BAD_GATEWAY, receipt.message));
    }
    Ok(Json(receipt))
}
