//! Gmail API v1: recent inbox messages with decoded bodies.
//!
//! Lists `in:inbox`, then fetches every message with `format=full`. A single
//! failed message fetch fails the whole call.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use futures::future::try_join_all;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use super::{MessageFetcher, check_status, http_client, trim_base};
use crate::error::IntegrationError;
use crate::pipeline::types::{EmailRecord, RawMessage};

const SERVICE: &str = "gmail";

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>?").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

// ── API response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageStub>,
}

#[derive(Debug, Deserialize)]
struct MessageStub {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageDetail {
    #[serde(default)]
    id: String,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    label_ids: Vec<String>,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<PayloadBody>,
    #[serde(default)]
    parts: Vec<Payload>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct PayloadBody {
    #[serde(default)]
    data: Option<String>,
}

impl Payload {
    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
    }

    fn data(&self) -> Option<&str> {
        self.body.as_ref().and_then(|b| b.data.as_deref())
    }
}

// ── Fetcher ─────────────────────────────────────────────────────────

/// Gmail inbox fetcher.
pub struct GmailFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl GmailFetcher {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, IntegrationError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: trim_base(base_url),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/gmail/v1/users/me/messages", self.base_url)
    }

    async fn fetch_message(&self, token: &str, id: &str) -> Result<RawMessage, IntegrationError> {
        let resp = self
            .client
            .get(format!("{}/{}", self.messages_url(), id))
            .bearer_auth(token)
            .query(&[("format", "full")])
            .send()
            .await?;
        let detail: MessageDetail = check_status(SERVICE, resp).await?.json().await?;
        Ok(RawMessage::Email(to_record(detail)))
    }
}

#[async_trait]
impl MessageFetcher for GmailFetcher {
    fn service(&self) -> &'static str {
        SERVICE
    }

    async fn fetch(&self, token: &str, limit: usize) -> Result<Vec<RawMessage>, IntegrationError> {
        let max_results = limit.to_string();
        let resp = self
            .client
            .get(self.messages_url())
            .bearer_auth(token)
            .query(&[("q", "in:inbox"), ("maxResults", max_results.as_str())])
            .send()
            .await?;
        let list: MessageListResponse = check_status(SERVICE, resp).await?.json().await?;

        if list.messages.is_empty() {
            debug!("Inbox is empty");
            return Ok(Vec::new());
        }

        let emails = try_join_all(
            list.messages
                .iter()
                .map(|stub| self.fetch_message(token, &stub.id)),
        )
        .await?;

        info!(count = emails.len(), "Fetched emails");
        Ok(emails)
    }
}

fn to_record(detail: MessageDetail) -> EmailRecord {
    let payload = detail.payload.unwrap_or_default();
    let body = extract_body(&payload);
    EmailRecord {
        id: Some(detail.id),
        thread_id: detail.thread_id,
        subject: payload.header("Subject"),
        from: payload.header("From"),
        date: payload.header("Date"),
        body: (!body.is_empty()).then_some(body),
        snippet: detail.snippet,
        label_ids: detail.label_ids,
    }
}

// ── Body extraction ─────────────────────────────────────────────────

/// Plain-text body of a message.
///
/// All `text/plain` parts concatenated; failing that, the first `text/html`
/// part with markup stripped; failing that, the top-level body data.
fn extract_body(payload: &Payload) -> String {
    if payload.parts.is_empty() {
        return payload.data().and_then(decode_url_safe_base64).unwrap_or_default();
    }

    let mut plain = String::new();
    collect_plain(&payload.parts, &mut plain);
    if !plain.is_empty() {
        return plain;
    }

    first_html(&payload.parts)
        .map(|html| strip_html(&html))
        .unwrap_or_default()
}

fn collect_plain(parts: &[Payload], out: &mut String) {
    for part in parts {
        match (part.mime_type.as_str(), part.data()) {
            ("text/plain", Some(data)) => {
                if let Some(text) = decode_url_safe_base64(data) {
                    out.push_str(&text);
                }
            }
            _ => collect_plain(&part.parts, out),
        }
    }
}

fn first_html(parts: &[Payload]) -> Option<String> {
    parts.iter().find_map(|part| match (part.mime_type.as_str(), part.data()) {
        ("text/html", Some(data)) => decode_url_safe_base64(data),
        _ => first_html(&part.parts),
    })
}

/// Replace tags with spaces and collapse whitespace.
pub fn strip_html(html: &str) -> String {
    let text = HTML_TAG.replace_all(html, " ");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Decode URL-safe base64 as used by the Gmail API. Padding is optional.
fn decode_url_safe_base64(data: &str) -> Option<String> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(text)
    }

    fn part(mime: &str, text: &str) -> Payload {
        Payload {
            mime_type: mime.into(),
            body: Some(PayloadBody {
                data: Some(encode(text)),
            }),
            ..Default::default()
        }
    }

    fn multipart(parts: Vec<Payload>) -> Payload {
        Payload {
            mime_type: "multipart/alternative".into(),
            parts,
            ..Default::default()
        }
    }

    #[test]
    fn detail_deserialization() {
        let json = r#"{
            "id": "m1",
            "threadId": "t1",
            "snippet": "Hello...",
            "labelIds": ["INBOX", "UNREAD"],
            "payload": {
                "mimeType": "text/plain",
                "headers": [
                    {"name": "From", "value": "Alex Johnson <alex@company.com>"},
                    {"name": "subject", "value": "Deadline"},
                    {"name": "Date", "value": "Fri, 5 Apr 2024 12:41:18 -0700"}
                ],
                "body": {"data": "SGVsbG8gd29ybGQ"}
            }
        }"#;
        let detail: MessageDetail = serde_json::from_str(json).unwrap();
        let record = to_record(detail);
        assert_eq!(record.id.as_deref(), Some("m1"));
        assert_eq!(record.subject.as_deref(), Some("Deadline"));
        assert_eq!(record.from.as_deref(), Some("Alex Johnson <alex@company.com>"));
        assert_eq!(record.body.as_deref(), Some("Hello world"));
        assert_eq!(record.label_ids, vec!["INBOX", "UNREAD"]);
    }

    #[test]
    fn detail_without_payload_has_no_body() {
        let detail: MessageDetail = serde_json::from_str(r#"{"id": "m2"}"#).unwrap();
        let record = to_record(detail);
        assert!(record.body.is_none());
        assert!(record.subject.is_none());
    }

    #[test]
    fn plain_parts_are_concatenated() {
        let payload = multipart(vec![
            part("text/plain", "Hello "),
            multipart(vec![part("text/plain", "world")]),
            part("text/html", "<b>ignored</b>"),
        ]);
        assert_eq!(extract_body(&payload), "Hello world");
    }

    #[test]
    fn html_used_when_no_plain_text() {
        let payload = multipart(vec![part(
            "text/html",
            "<html><body><p>Team   lunch</p>\n<p>at noon</p></body></html>",
        )]);
        assert_eq!(extract_body(&payload), "Team lunch at noon");
    }

    #[test]
    fn strip_html_handles_unclosed_tag() {
        assert_eq!(strip_html("Hi <b>there</b> <br"), "Hi there");
    }

    #[test]
    fn decode_accepts_padding_and_rejects_garbage() {
        assert_eq!(decode_url_safe_base64("SGk=").as_deref(), Some("Hi"));
        assert!(decode_url_safe_base64("!!!").is_none());
    }
}
