//! Shared types for the message pipeline.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sentinel rendered for timestamps that could not be parsed.
pub const UNKNOWN_DATE: &str = "unknown date";

// ── Source tag ──────────────────────────────────────────────────────

/// Which kind of provider a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSource {
    Email,
    Chat,
}

impl MessageSource {
    /// Short label used in ids and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Chat => "chat",
        }
    }

    /// How the message kind is named in the classifier prompt.
    pub fn prompt_label(&self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::Chat => "Slack message",
        }
    }
}

impl fmt::Display for MessageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Raw provider records ────────────────────────────────────────────

/// A message as fetched from a provider, before normalization.
///
/// Tagged by `source`; the provider names `gmail` and `slack` are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source")]
pub enum RawMessage {
    #[serde(rename = "email", alias = "gmail")]
    Email(EmailRecord),
    #[serde(rename = "chat", alias = "slack")]
    Chat(ChatRecord),
}

impl RawMessage {
    pub fn source(&self) -> MessageSource {
        match self {
            Self::Email(_) => MessageSource::Email,
            Self::Chat(_) => MessageSource::Chat,
        }
    }

    /// Provider-native id, if the record carries one.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Email(e) => e.id.as_deref(),
            Self::Chat(c) => c.id.as_deref().or(c.ts.as_deref()),
        }
    }
}

/// An email record (Gmail message with headers already extracted).
///
/// Every field is optional and tolerant of the wrong JSON type: scalars are
/// read as strings and anything else becomes absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// `From` header, usually `Name <address>`.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// `Date` header (RFC 2822), an RFC 3339 string, or epoch milliseconds.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Decoded plain-text body.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings", skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<String>,
}

/// A chat record (Slack message with channel info attached).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Fixed-point epoch seconds, e.g. `"1712345678.000200"`.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    /// Pre-rendered date some clients send instead of `ts`.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

/// Strings pass through, numbers and booleans are rendered, and anything
/// else (null, arrays, objects) is treated as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_to_string))
}

/// An array of scalars; any other shape, including null, is empty.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => {
            items.into_iter().filter_map(scalar_to_string).collect()
        }
        _ => Vec::new(),
    })
}

fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ── Normalized message ──────────────────────────────────────────────

/// When a message was sent, or the sentinel when that is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTimestamp {
    At(DateTime<Utc>),
    Unknown,
}

impl MessageTimestamp {
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(dt) => Some(*dt),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for MessageTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Unknown => f.write_str(UNKNOWN_DATE),
        }
    }
}

impl Serialize for MessageTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MessageTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|dt| Self::At(dt.with_timezone(&Utc)))
            .unwrap_or(Self::Unknown))
    }
}

/// Provider-independent view of a message.
///
/// Derived deterministically from a `RawMessage`; it has no identity of its own
/// beyond the provider id it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: MessageSource,
    /// Email subject or `#channel`.
    pub title: String,
    /// Display name of the sender (email) or the user id (chat).
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_address: Option<String>,
    pub timestamp: MessageTimestamp,
    pub body: String,
}
