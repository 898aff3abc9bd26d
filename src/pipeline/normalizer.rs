//! Message normalizer: maps provider records onto `NormalizedMessage`.
//!
//! Pure and infallible: malformed input is repaired with placeholders
//! rather than rejected.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::types::{
    ChatRecord, EmailRecord, MessageSource, MessageTimestamp, NormalizedMessage, RawMessage,
};
use crate::error::NormalizationError;

pub const NO_SUBJECT: &str = "No Subject";
pub const UNTITLED_CHAT: &str = "Message";
pub const UNKNOWN_SENDER: &str = "Unknown Sender";
pub const UNKNOWN_USER: &str = "Unknown User";

/// `Display Name <address>`
static NAMED_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(.*?)\s*<([^<>]*)>\s*$").expect("valid regex"));

/// Trailing RFC 2822 comment such as `(PDT)`.
static TRAILING_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^()]*\)\s*$").expect("valid regex"));

/// Normalize one raw message.
pub fn normalize(raw: &RawMessage) -> NormalizedMessage {
    match raw {
        RawMessage::Email(email) => normalize_email(email),
        RawMessage::Chat(chat) => normalize_chat(chat),
    }
}

/// Read a JSON value as a raw message, then normalize it.
///
/// Fails only when the value is not a message shape at all (not an object,
/// or no recognised `source` tag). Missing fields are still repaired.
pub fn normalize_value(value: &Value) -> Result<NormalizedMessage, NormalizationError> {
    let raw = RawMessage::deserialize(value)
        .map_err(|e| NormalizationError::Malformed(e.to_string()))?;
    Ok(normalize(&raw))
}

fn normalize_email(email: &EmailRecord) -> NormalizedMessage {
    let title = non_blank(email.subject.as_deref())
        .unwrap_or(NO_SUBJECT)
        .to_string();

    let (sender, sender_address) = match non_blank(email.from.as_deref()) {
        Some(from) => split_sender(from),
        None => (UNKNOWN_SENDER.to_string(), None),
    };

    let timestamp = email
        .date
        .as_deref()
        .and_then(parse_email_date)
        .map(MessageTimestamp::At)
        .unwrap_or(MessageTimestamp::Unknown);

    let body = non_blank(email.body.as_deref())
        .or_else(|| non_blank(email.snippet.as_deref()))
        .unwrap_or_default()
        .to_string();

    NormalizedMessage {
        id: non_blank(email.id.as_deref()).map(str::to_string),
        source: MessageSource::Email,
        title,
        sender,
        sender_address,
        timestamp,
        body,
    }
}

fn normalize_chat(chat: &ChatRecord) -> NormalizedMessage {
    let title = non_blank(chat.channel_name.as_deref())
        .map(|name| format!("#{}", name.trim_start_matches('#')))
        .unwrap_or_else(|| UNTITLED_CHAT.to_string());

    let sender = non_blank(chat.user_id.as_deref())
        .unwrap_or(UNKNOWN_USER)
        .to_string();

    let timestamp = chat
        .ts
        .as_deref()
        .and_then(parse_chat_ts)
        .or_else(|| chat.date.as_deref().and_then(parse_rfc3339))
        .map(MessageTimestamp::At)
        .unwrap_or(MessageTimestamp::Unknown);

    // Slack uses the message `ts` as its id.
    let id = non_blank(chat.id.as_deref())
        .or_else(|| non_blank(chat.ts.as_deref()))
        .map(str::to_string);

    NormalizedMessage {
        id,
        source: MessageSource::Chat,
        title,
        sender,
        sender_address: None,
        timestamp,
        body: chat.text.clone().unwrap_or_default(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Split `Name <addr>` into its parts. Anything else is kept verbatim.
pub fn split_sender(from: &str) -> (String, Option<String>) {
    let Some(caps) = NAMED_ADDRESS.captures(from) else {
        return (from.trim().to_string(), None);
    };
    let name = caps[1].trim().trim_matches('"').trim();
    let address = caps[2].trim();
    let address = (!address.is_empty()).then(|| address.to_string());

    if name.is_empty() {
        let display = address.clone().unwrap_or_else(|| from.trim().to_string());
        (display, address)
    } else {
        (name.to_string(), address)
    }
}

/// Parse an email `Date` header (RFC 2822, with or without a trailing
/// comment), an RFC 3339 string, or integer epoch milliseconds.
pub fn parse_email_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis);
    }
    let without_comment = TRAILING_COMMENT.replace(trimmed, "");
    DateTime::parse_from_rfc2822(&without_comment)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| parse_rfc3339(trimmed))
}

/// Parse a Slack `ts` (`"<seconds>.<fraction>"`), falling back to RFC 3339.
pub fn parse_chat_ts(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    let (secs, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));

    if !secs.is_empty()
        && secs.chars().all(|c| c.is_ascii_digit())
        && frac.chars().all(|c| c.is_ascii_digit())
    {
        let secs: i64 = secs.parse().ok()?;
        let nanos: u32 = if frac.is_empty() {
            0
        } else {
            let mut digits: String = frac.chars().take(9).collect();
            while digits.len() < 9 {
                digits.push('0');
            }
            digits.parse().ok()?
        };
        return DateTime::from_timestamp(secs, nanos);
    }

    parse_rfc3339(trimmed)
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
