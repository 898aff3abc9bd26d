//! Task REST endpoints.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use crate::pipeline::analysis::Analysis;
use crate::pipeline::normalizer::normalize_value;
use crate::tasks::model::{NewTask, TaskFilter, TaskPatch};
use crate::tasks::promote::promote_action_items;

pub const MISSING_FIELDS: &str = "Missing required task fields";
pub const ID_REQUIRED: &str = "Task ID is required";

#[derive(Debug, Deserialize)]
pub(super) struct IdQuery {
    id: Option<String>,
}

pub(super) async fn list_tasks(
    State(state): State<AppState>,
    query: Result<Query<TaskFilter>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(filter) = query?;
    let tasks = state.tasks.list(&filter).await?;
    Ok(Json(json!({ "tasks": tasks })))
}

pub(super) async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = payload?;

    let has_title = body
        .get("title")
        .and_then(Value::as_str)
        .is_some_and(|t| !t.trim().is_empty());
    let present = |key: &str| body.get(key).is_some_and(|v| !v.is_null());
    if !has_title || !present("priority") || !present("source") {
        return Err(ApiError::bad_request(MISSING_FIELDS));
    }

    let new: NewTask = serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid task: {e}")))?;
    let task = state.tasks.create(new).await?;
    Ok((StatusCode::CREATED, Json(json!({ "task": task }))))
}

/// `{id, ...fields, expectedVersion?}`.
pub(super) async fn update_task(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let id = body
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request(ID_REQUIRED))?
        .to_string();

    let patch: TaskPatch = serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid task update: {e}")))?;
    let task = state.tasks.update(&id, patch).await?;
    Ok(Json(json!({ "task": task })))
}

pub(super) async fn delete_task(
    State(state): State<AppState>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(IdQuery { id }) = query?;
    let id = id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request(ID_REQUIRED))?;
    let task = state.tasks.delete(&id).await?;
    Ok(Json(json!({ "task": task })))
}

/// `{message, analysis}` → one task per action item.
pub(super) async fn promote_tasks(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = payload?;
    let (Some(message), Some(analysis)) = (body.get("message"), body.get("analysis")) else {
        return Err(ApiError::bad_request(
            "Expected \"message\" and \"analysis\" fields",
        ));
    };

    let message = normalize_value(message)?;
    let analysis: Analysis = serde_json::from_value(analysis.clone())
        .map_err(|e| ApiError::bad_request(format!("Invalid analysis: {e}")))?;

    let mut tasks = Vec::new();
    for new in promote_action_items(&message, &analysis) {
        tasks.push(state.tasks.create(new).await?);
    }
    Ok((StatusCode::CREATED, Json(json!({ "tasks": tasks }))))
}
