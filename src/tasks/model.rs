//! Task data model: tasks, priorities, sources, and the create/patch/filter
//! inputs accepted by the store.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::analysis::Priority;
use crate::pipeline::types::MessageSource;

/// Task urgency. A separate scale from message `Priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    /// CRITICAL → high, ACTION → medium, INFO → low.
    pub fn from_message_priority(priority: Priority) -> Self {
        match priority {
            Priority::Critical => Self::High,
            Priority::Action => Self::Medium,
            Priority::Info => Self::Low,
        }
    }
}

/// Where a task came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskSourceKind {
    #[serde(alias = "gmail")]
    Email,
    #[serde(alias = "slack")]
    Chat,
    Manual,
}

impl From<MessageSource> for TaskSourceKind {
    fn from(source: MessageSource) -> Self {
        match source {
            MessageSource::Email => Self::Email,
            MessageSource::Chat => Self::Chat,
        }
    }
}

/// Back-reference to the message a task was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSource {
    #[serde(rename = "type")]
    pub kind: TaskSourceKind,
    /// Message title (subject or `#channel`).
    pub title: String,
    /// Message id.
    pub id: String,
}

impl TaskSource {
    pub fn new(kind: TaskSourceKind, title: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            id: id.into(),
        }
    }
}

/// A single task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// `task_<uuid>`.
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub source: TaskSource,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Bumped on every update. Starts at 1.
    pub version: u64,
}

impl Task {
    pub fn new_id() -> String {
        format!("task_{}", Uuid::new_v4().simple())
    }

    /// Incomplete and high priority.
    pub fn is_urgent(&self) -> bool {
        !self.completed && self.priority == TaskPriority::High
    }
}

/// Fields for creating a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub source: TaskSource,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub completed: bool,
}

impl NewTask {
    pub fn new(title: impl Into<String>, priority: TaskPriority, source: TaskSource) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date: None,
            priority,
            source,
            tags: BTreeSet::new(),
            completed: false,
        }
    }

    /// Builder: set description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Builder: set due date.
    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    /// Builder: set tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Materialize with a fresh id at version 1.
    pub fn into_task(self, created_at: DateTime<Utc>) -> Task {
        Task {
            id: Task::new_id(),
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            priority: self.priority,
            source: self.source,
            tags: self.tags,
            completed: self.completed,
            created_at,
            updated_at: None,
            version: 1,
        }
    }
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskPatch {
    pub title: Option<String>,
    /// `Some(None)` clears the description; `None` leaves it alone.
    #[serde(deserialize_with = "present")]
    pub description: Option<Option<String>>,
    /// `Some(None)` clears the due date; `None` leaves it alone.
    #[serde(deserialize_with = "present")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub priority: Option<TaskPriority>,
    pub tags: Option<BTreeSet<String>>,
    pub completed: Option<bool>,
    /// Reject the update unless the task is still at this version.
    pub expected_version: Option<u64>,
}

impl TaskPatch {
    pub fn completed(done: bool) -> Self {
        Self {
            completed: Some(done),
            ..Default::default()
        }
    }

    /// Merge into `task`. Does not touch `version` or `updated_at`.
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(due) = self.due_date {
            task.due_date = due;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(tags) = self.tags {
            task.tags = tags;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

/// Distinguish an explicit `null` from an absent field: absent stays `None`
/// via `default`, while anything present (including `null`) is `Some`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// List filter. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskFilter {
    pub source_id: Option<String>,
    pub completed: Option<bool>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.source_id
            .as_deref()
            .is_none_or(|id| task.source.id == id)
            && self.completed.is_none_or(|done| task.completed == done)
    }
}
