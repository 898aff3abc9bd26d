//! Demo data: three classified messages and two open tasks.
//!
//! `GET /briefing` composes over these messages until live fetching is wired
//! into a per-user inbox, and the task store can be seeded with the tasks.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use crate::pipeline::analysis::{Analysis, ClassifiedMessage, Priority};
use crate::pipeline::types::{MessageSource, MessageTimestamp, NormalizedMessage};
use crate::tasks::model::{Task, TaskPriority, TaskSource, TaskSourceKind};

fn tags(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// One CRITICAL email, one ACTION chat message and one INFO email, all sent at `now`.
pub fn sample_messages(now: DateTime<Utc>) -> Vec<ClassifiedMessage> {
    let at = MessageTimestamp::At(now);
    vec![
        ClassifiedMessage::new(
            NormalizedMessage {
                id: Some("msg1".into()),
                source: MessageSource::Email,
                title: "Project Deadline Reminder".into(),
                sender: "Alex Johnson".into(),
                sender_address: Some("alex@company.com".into()),
                timestamp: at,
                body: "Just a reminder that the project deadline is tomorrow. \
                       Please make sure to submit your work by 5 PM."
                    .into(),
            },
            Analysis {
                priority: Priority::Critical,
                summary: "Urgent reminder about project deadline tomorrow at 5 PM.".into(),
                action_items: strings(&[
                    "Submit project work by 5 PM tomorrow",
                    "Send confirmation email after submission",
                ]),
                tags: tags(&["deadline", "project", "urgent"]),
            },
        ),
        ClassifiedMessage::new(
            NormalizedMessage {
                id: Some("msg2".into()),
                source: MessageSource::Chat,
                title: "#general".into(),
                sender: "U123456".into(),
                sender_address: None,
                timestamp: at,
                body: "Team meeting at 2 PM today to discuss the quarterly goals. \
                       Please prepare your updates."
                    .into(),
            },
            Analysis {
                priority: Priority::Action,
                summary: "Team meeting scheduled for 2 PM today to discuss quarterly goals."
                    .into(),
                action_items: strings(&[
                    "Prepare department updates for the meeting",
                    "Join meeting at 2 PM",
                ]),
                tags: tags(&["meeting", "quarterly-goals"]),
            },
        ),
        ClassifiedMessage::new(
            NormalizedMessage {
                id: Some("msg3".into()),
                source: MessageSource::Email,
                title: "Weekly Newsletter".into(),
                sender: "Marketing Team".into(),
                sender_address: Some("marketing@company.com".into()),
                timestamp: at,
                body: "Check out the latest company updates in our weekly newsletter.".into(),
            },
            Analysis {
                priority: Priority::Info,
                summary: "Weekly company newsletter with updates on new clients, \
                          office maintenance, and team lunch."
                    .into(),
                action_items: Vec::new(),
                tags: tags(&["newsletter", "announcements"]),
            },
        ),
    ]
}

/// Two open tasks derived from the sample messages: one high (due in a day),
/// one medium (due in three hours).
pub fn sample_tasks(now: DateTime<Utc>) -> Vec<Task> {
    vec![
        Task {
            id: "task1".into(),
            title: "Submit project work by 5 PM tomorrow".into(),
            description: Some(
                "Ensure all deliverables are included in the final package \
                 and notify team when complete."
                    .into(),
            ),
            due_date: Some(now + Duration::hours(24)),
            priority: TaskPriority::High,
            source: TaskSource::new(TaskSourceKind::Email, "Project Deadline Reminder", "msg1"),
            tags: tags(&["deadline", "project", "urgent"]),
            completed: false,
            created_at: now,
            updated_at: None,
            version: 1,
        },
        Task {
            id: "task2".into(),
            title: "Prepare department updates for the meeting".into(),
            description: None,
            due_date: Some(now + Duration::hours(3)),
            priority: TaskPriority::Medium,
            source: TaskSource::new(TaskSourceKind::Chat, "#general", "msg2"),
            tags: tags(&["meeting", "quarterly-goals"]),
            completed: false,
            created_at: now,
            updated_at: None,
            version: 1,
        },
    ]
}
