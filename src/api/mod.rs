//! HTTP API: axum router and shared handler state.

pub mod error;

mod analyze;
mod briefing;
mod messages;
mod tasks;

use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::briefing::delivery::BriefingDelivery;
use crate::integrations::MessageFetcher;
use crate::pipeline::classifier::MessageClassifier;
use crate::tasks::store::TaskStore;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<MessageClassifier>,
    pub tasks: Arc<dyn TaskStore>,
    pub delivery: Arc<dyn BriefingDelivery>,
    /// Email source for `GET /messages/email`.
    pub email: Arc<dyn MessageFetcher>,
    /// Chat source for `GET /messages/slack`.
    pub chat: Arc<dyn MessageFetcher>,
}

/// Build the router with every FlowSync route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze::analyze))
        .route(
            "/briefing",
            get(briefing::get_briefing).post(briefing::deliver_briefing),
        )
        .route(
            "/tasks",
            get(tasks::list_tasks)
                .post(tasks::create_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/tasks/promote", post(tasks::promote_tasks))
        .route("/messages/email", get(messages::list_emails))
        .route("/messages/slack", get(messages::list_slack_messages))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "flowsync"
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::briefing::delivery::LoggingDelivery;
    use crate::error::{IntegrationError, LlmError};
    use crate::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
    use crate::pipeline::classifier::{ClassifierConfig, FailurePolicy};
    use crate::pipeline::types::{ChatRecord, RawMessage};
    use crate::tasks::store::InMemoryTaskStore;

    /// Always answers with the same text.
    struct FixedLlm(&'static str);

    #[async_trait]
    impl LlmProvider for FixedLlm {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                content: self.0.to_string(),
                finish_reason: FinishReason::Stop,
            })
        }
    }

    /// Returns one canned chat message for any token.
    struct CannedFetcher;

    #[async_trait]
    impl MessageFetcher for CannedFetcher {
        fn service(&self) -> &'static str {
            "canned"
        }

        async fn fetch(
            &self,
            token: &str,
            _limit: usize,
        ) -> Result<Vec<RawMessage>, IntegrationError> {
            if token == "bad" {
                return Err(IntegrationError::Unauthorized {
                    service: "canned".into(),
                });
            }
            Ok(vec![RawMessage::Chat(ChatRecord {
                ts: Some("1712345678.000200".into()),
                text: Some("hello".into()),
                ..Default::default()
            })])
        }
    }

    const ACTION_JSON: &str = r#"{"priority": "action", "summary": "Reply to Bob.", "actionItems": ["Reply to Bob", "Book room"], "tags": ["email"]}"#;

    fn app_with(llm: &'static str, policy: FailurePolicy) -> Router {
        app_with_config(
            llm,
            ClassifierConfig {
                failure_policy: policy,
                batch_interval: std::time::Duration::ZERO,
                ..Default::default()
            },
        )
    }

    fn app_with_config(llm: &'static str, config: ClassifierConfig) -> Router {
        router(AppState {
            classifier: Arc::new(MessageClassifier::new(Arc::new(FixedLlm(llm)), config)),
            tasks: Arc::new(InMemoryTaskStore::new()),
            delivery: Arc::new(LoggingDelivery),
            email: Arc::new(CannedFetcher),
            chat: Arc::new(CannedFetcher),
        })
    }

    fn app() -> Router {
        app_with(ACTION_JSON, FailurePolicy::Degrade)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, text) = send_raw(app, method, uri, body).await;
        let json = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap()
        };
        (status, json)
    }

    async fn send_raw(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, String) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn email_json(id: &str) -> Value {
        json!({
            "source": "gmail",
            "id": id,
            "subject": "Status?",
            "from": "Bob <bob@company.com>",
            "body": "Can you send the status report?"
        })
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    // ── /analyze ────────────────────────────────────────────────────

    #[tokio::test]
    async fn analyze_empty_body_is_bad_request() {
        let (status, body) = send(&app(), "POST", "/analyze", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Invalid request body. Expected \"message\" or \"messages\" field."
        );
    }

    #[tokio::test]
    async fn analyze_empty_batch_is_bad_request() {
        let (status, body) =
            send(&app(), "POST", "/analyze", Some(json!({"messages": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No messages provided for analysis");
    }

    #[tokio::test]
    async fn analyze_single_message() {
        let (status, body) = send(
            &app(),
            "POST",
            "/analyze",
            Some(json!({"message": email_json("m1")})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"]["priority"], "action");
        assert_eq!(body["analysis"]["actionItems"][0], "Reply to Bob");
    }

    #[tokio::test]
    async fn analyze_batch_keys_by_id() {
        let (status, body) = send(
            &app(),
            "POST",
            "/analyze",
            Some(json!({"messages": [email_json("m1"), email_json("m2")]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"]["m1"]["priority"], "action");
        assert_eq!(body["analysis"]["m2"]["summary"], "Reply to Bob.");
    }

    #[tokio::test]
    async fn analyze_batch_keeps_input_order() {
        let (status, text) = send_raw(
            &app(),
            "POST",
            "/analyze",
            Some(json!({"messages": [email_json("zeta"), email_json("alpha"), email_json("mid")]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let zeta = text.find("\"zeta\"").unwrap();
        let alpha = text.find("\"alpha\"").unwrap();
        let mid = text.find("\"mid\"").unwrap();
        assert!(zeta < alpha && alpha < mid, "keys out of order: {text}");
    }

    #[tokio::test]
    async fn analyze_batch_with_concurrency() {
        let config = ClassifierConfig {
            batch_interval: std::time::Duration::from_millis(5),
            batch_concurrency: 3,
            ..Default::default()
        };
        let app = app_with_config(ACTION_JSON, config);
        let messages: Vec<Value> = (0..6).map(|i| email_json(&format!("m{i}"))).collect();
        let (status, body) =
            send(&app, "POST", "/analyze", Some(json!({ "messages": messages }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"].as_object().unwrap().len(), 6);
        assert_eq!(body["analysis"]["m5"]["priority"], "action");
    }

    #[tokio::test]
    async fn analyze_repairs_mistyped_fields() {
        let (status, body) = send(
            &app(),
            "POST",
            "/analyze",
            Some(json!({"message": {"source": "gmail", "date": 1712345678000_i64}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"]["priority"], "action");

        let odd = json!({
            "source": "gmail",
            "id": "odd",
            "subject": 7,
            "date": 5,
            "labelIds": null
        });
        let (status, body) = send(
            &app(),
            "POST",
            "/analyze",
            Some(json!({"messages": [email_json("good"), odd]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"]["good"]["priority"], "action");
        assert_eq!(body["analysis"]["odd"]["priority"], "action");
    }

    #[tokio::test]
    async fn analyze_degrades_on_garbage_model_output() {
        let app = app_with("I'd rather not.", FailurePolicy::Degrade);
        let (status, body) = send(
            &app,
            "POST",
            "/analyze",
            Some(json!({"message": email_json("m1")})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"]["priority"], "info");
        assert_eq!(body["analysis"]["tags"], json!(["error"]));
    }

    #[tokio::test]
    async fn analyze_propagate_policy_is_bad_gateway() {
        let app = app_with("I'd rather not.", FailurePolicy::Propagate);
        let (status, body) = send(
            &app,
            "POST",
            "/analyze",
            Some(json!({"message": email_json("m1")})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("no JSON found"));
    }

    #[tokio::test]
    async fn analyze_rejects_non_message_values() {
        let (status, body) = send(
            &app(),
            "POST",
            "/analyze",
            Some(json!({"message": {"source": "fax"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Malformed raw message"));
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request_with_error_body() {
        let app = app();
        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());
    }

    // ── /tasks ──────────────────────────────────────────────────────

    fn task_json() -> Value {
        json!({
            "title": "Submit report",
            "priority": "high",
            "source": {"type": "gmail", "title": "Deadline", "id": "msg1"},
            "tags": ["deadline"]
        })
    }

    #[tokio::test]
    async fn task_crud_round() {
        let app = app();

        let (status, created) = send(&app, "POST", "/tasks", Some(task_json())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["task"]["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("task_"));
        assert_eq!(created["task"]["completed"], false);

        let (status, updated) = send(
            &app,
            "PATCH",
            "/tasks",
            Some(json!({"id": id, "completed": true, "expectedVersion": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["task"]["completed"], true);
        assert_eq!(updated["task"]["version"], 2);
        assert!(updated["task"]["updatedAt"].is_string());

        let (_, done) = send(&app, "GET", "/tasks?completed=true", None).await;
        assert_eq!(done["tasks"].as_array().unwrap().len(), 1);
        let (_, open) = send(&app, "GET", "/tasks?completed=false", None).await;
        assert!(open["tasks"].as_array().unwrap().is_empty());
        let (_, by_source) = send(&app, "GET", "/tasks?sourceId=msg1", None).await;
        assert_eq!(by_source["tasks"].as_array().unwrap().len(), 1);

        let (status, deleted) = send(&app, "DELETE", &format!("/tasks?id={id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["task"]["id"], id.as_str());

        let (_, all) = send(&app, "GET", "/tasks", None).await;
        assert!(all["tasks"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn patch_null_clears_description_and_due_date() {
        let app = app();
        let mut body = task_json();
        body["description"] = json!("Quarterly numbers");
        body["dueDate"] = json!("2024-04-05T19:41:18Z");
        let (_, created) = send(&app, "POST", "/tasks", Some(body)).await;
        let id = created["task"]["id"].as_str().unwrap().to_string();
        assert_eq!(created["task"]["description"], "Quarterly numbers");

        let (status, updated) = send(
            &app,
            "PATCH",
            "/tasks",
            Some(json!({"id": id, "description": null, "dueDate": null})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(updated["task"].get("description").is_none());
        assert!(updated["task"].get("dueDate").is_none());
        assert_eq!(updated["task"]["title"], "Submit report");
    }

    #[tokio::test]
    async fn create_task_requires_fields() {
        let (status, body) =
            send(&app(), "POST", "/tasks", Some(json!({"title": "No priority"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required task fields");
    }

    #[tokio::test]
    async fn patch_unknown_task_is_not_found() {
        let (status, body) = send(
            &app(),
            "PATCH",
            "/tasks",
            Some(json!({"id": "task_nope", "completed": true})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Task not found");
    }

    #[tokio::test]
    async fn patch_without_id_is_bad_request() {
        let (status, body) =
            send(&app(), "PATCH", "/tasks", Some(json!({"completed": true}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Task ID is required");
    }

    #[tokio::test]
    async fn patch_with_stale_version_conflicts() {
        let app = app();
        let (_, created) = send(&app, "POST", "/tasks", Some(task_json())).await;
        let id = created["task"]["id"].as_str().unwrap().to_string();
        send(&app, "PATCH", "/tasks", Some(json!({"id": id, "title": "v2"}))).await;

        let (status, _) = send(
            &app,
            "PATCH",
            "/tasks",
            Some(json!({"id": id, "title": "v3", "expectedVersion": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn delete_requires_id() {
        let (status, body) = send(&app(), "DELETE", "/tasks", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Task ID is required");
    }

    #[tokio::test]
    async fn promote_creates_one_task_per_action_item() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/tasks/promote",
            Some(json!({
                "message": email_json("m9"),
                "analysis": {
                    "priority": "critical",
                    "summary": "Status report due.",
                    "actionItems": ["Send status report", "Cc the team"],
                    "tags": ["report"]
                }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let tasks = body["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0]["priority"], "high");
        assert_eq!(tasks[0]["source"]["id"], "m9");

        let (_, listed) = send(&app, "GET", "/tasks?sourceId=m9", None).await;
        assert_eq!(listed["tasks"].as_array().unwrap().len(), 2);
    }

    // ── /briefing ───────────────────────────────────────────────────

    #[tokio::test]
    async fn get_briefing_uses_sample_messages() {
        let (status, body) = send(&app(), "GET", "/briefing", None).await;
        assert_eq!(status, StatusCode::OK);
        let briefing = &body["briefing"];
        assert_eq!(briefing["criticalMessages"].as_array().unwrap().len(), 1);
        assert_eq!(briefing["actionMessages"].as_array().unwrap().len(), 1);
        let summary = briefing["summary"].as_str().unwrap();
        assert!(summary.starts_with("Good morning!"));
        assert!(summary.ends_with("Have a productive day!"));
    }

    #[tokio::test]
    async fn post_briefing_requires_text() {
        let (status, body) = send(&app(), "POST", "/briefing", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Briefing text is required for audio conversion");

        let (status, body) =
            send(&app(), "POST", "/briefing", Some(json!({"text": "Morning!"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(
            body["telegramMessageId"]
                .as_str()
                .unwrap()
                .starts_with("mock_telegram_msg_")
        );
    }

    // ── /messages ───────────────────────────────────────────────────

    #[tokio::test]
    async fn email_listing_requires_bearer_token() {
        let (status, body) = send(&app(), "GET", "/messages/email", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "You must be signed in to access emails");

        let request = Request::builder()
            .uri("/messages/email?limit=5")
            .header(header::AUTHORIZATION, "Bearer good")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn slack_listing_reads_cookie() {
        let (status, body) = send(&app(), "GET", "/messages/slack", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Slack authentication required");

        let request = Request::builder()
            .uri("/messages/slack")
            .header(header::COOKIE, "slack_token=good")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["messages"][0]["source"], "chat");
    }

    #[tokio::test]
    async fn rejected_token_is_unauthorized() {
        let request = Request::builder()
            .uri("/messages/slack")
            .header(header::COOKIE, "slack_token=bad")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
