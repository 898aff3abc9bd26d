//! Classification output: priority levels and the `Analysis` record.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::NormalizedMessage;

/// Summary used when the model omits one.
pub const NO_SUMMARY: &str = "No summary available";

/// Summary of the degraded analysis returned on classifier failure.
pub const FAILED_SUMMARY: &str = "Failed to analyze the message";

/// Tag attached to degraded analyses.
pub const ERROR_TAG: &str = "error";

/// Message severity. Ordered `Info < Action < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// No action needed: newsletters, updates, FYI.
    Info,
    /// Needs a response or action, but not urgent.
    Action,
    /// Urgent: deadline within 24 hours, emergency, critical issue.
    Critical,
}

impl Priority {
    /// Case-insensitive exact match against the three literals; anything
    /// else, including padded values, is `Info`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "action" => Self::Action,
            _ => Self::Info,
        }
    }

    /// Coerce an arbitrary JSON value. Non-strings and absent values are `Info`.
    pub fn from_json(value: Option<&Value>) -> Self {
        value
            .and_then(Value::as_str)
            .map(Self::parse_lenient)
            .unwrap_or(Self::Info)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Action => "action",
            Self::Info => "info",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Critical => "🔴",
            Self::Action => "🟠",
            Self::Info => "🟢",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured result of classifying one message.
///
/// Never mutated after construction; re-analysis produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub priority: Priority,
    pub summary: String,
    #[serde(default)]
    pub action_items: Vec<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Analysis {
    /// The value returned when classification fails and the policy degrades.
    pub fn degraded() -> Self {
        Self {
            priority: Priority::Info,
            summary: FAILED_SUMMARY.to_string(),
            action_items: Vec::new(),
            tags: BTreeSet::from([ERROR_TAG.to_string()]),
        }
    }

    /// Whether this is the degraded fallback rather than a real classification.
    pub fn is_degraded(&self) -> bool {
        self.tags.contains(ERROR_TAG) && self.summary == FAILED_SUMMARY
    }

    /// Coerce a parsed model response into a valid `Analysis`.
    ///
    /// Unknown priority → `Info`; missing or blank summary → placeholder;
    /// non-array `actionItems`/`tags` → empty; non-string elements dropped.
    pub fn from_model_json(value: &Value) -> Self {
        let summary = value
            .get("summary")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(NO_SUMMARY)
            .to_string();

        Self {
            priority: Priority::from_json(value.get("priority")),
            summary,
            action_items: string_array(value.get("actionItems")).collect(),
            tags: string_array(value.get("tags")).collect(),
        }
    }
}

fn string_array(value: Option<&Value>) -> impl Iterator<Item = String> + '_ {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A normalized message paired with its analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedMessage {
    #[serde(flatten)]
    pub message: NormalizedMessage,
    pub analysis: Analysis,
}

impl ClassifiedMessage {
    pub fn new(message: NormalizedMessage, analysis: Analysis) -> Self {
        Self { message, analysis }
    }

    pub fn priority(&self) -> Priority {
        self.analysis.priority
    }
}
