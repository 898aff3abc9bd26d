//! Briefing composer: a templated daily digest over classified messages and
//! tasks. Pure: the only clock is the `now` passed in.

use std::fmt::{Display, Write as _};

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::analysis::{ClassifiedMessage, Priority};
use crate::tasks::model::Task;

/// Closing line of every summary.
pub const SIGN_OFF: &str = "Have a productive day!";

/// A point-in-time digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Briefing {
    pub timestamp: DateTime<Utc>,
    /// CRITICAL messages, in input order.
    pub critical_messages: Vec<ClassifiedMessage>,
    /// ACTION messages, in input order.
    pub action_messages: Vec<ClassifiedMessage>,
    /// Incomplete tasks, in input order.
    pub upcoming_tasks: Vec<Task>,
    pub summary: String,
}

/// Compose a briefing using the local clock.
pub fn compose(messages: &[ClassifiedMessage], tasks: &[Task]) -> Briefing {
    compose_at(messages, tasks, Local::now())
}

/// Compose a briefing as of `now`. "Today" is the calendar day of `now` in its
/// own timezone.
pub fn compose_at<Tz>(messages: &[ClassifiedMessage], tasks: &[Task], now: DateTime<Tz>) -> Briefing
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let with_priority = |p: Priority| -> Vec<ClassifiedMessage> {
        messages
            .iter()
            .filter(|m| m.priority() == p)
            .cloned()
            .collect()
    };

    Briefing {
        timestamp: now.with_timezone(&Utc),
        critical_messages: with_priority(Priority::Critical),
        action_messages: with_priority(Priority::Action),
        upcoming_tasks: tasks.iter().filter(|t| !t.completed).cloned().collect(),
        summary: summarize(messages, tasks, &now),
    }
}

/// Render the summary text.
pub fn summarize<Tz>(messages: &[ClassifiedMessage], tasks: &[Task], now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let count = |p: Priority| messages.iter().filter(|m| m.priority() == p).count();
    let critical = count(Priority::Critical);
    let action = count(Priority::Action);

    let today = now.date_naive();
    let due_today = tasks
        .iter()
        .filter(|t| !t.completed)
        .filter_map(|t| t.due_date)
        .filter(|due| due.with_timezone(&now.timezone()).date_naive() == today)
        .count();

    let mut summary = format!(
        "Good morning! Here's your daily briefing for {}.\n\n",
        now.format("%-m/%-d/%Y")
    );

    // Writing into a String cannot fail.
    if critical > 0 {
        let _ = writeln!(
            summary,
            "You have {critical} critical message{} requiring immediate attention.",
            plural(critical)
        );
    }
    if action > 0 {
        let verb = if action == 1 { "is" } else { "are" };
        let _ = writeln!(
            summary,
            "There {verb} {action} message{} that require action.",
            plural(action)
        );
    }
    if due_today > 0 {
        let _ = writeln!(
            summary,
            "You have {due_today} task{} due today.",
            plural(due_today)
        );
    }
    if let Some(urgent) = tasks.iter().find(|t| t.is_urgent()) {
        let _ = writeln!(summary, "\nMost urgent task: {}", urgent.title);
    }

    summary.push('\n');
    summary.push_str(SIGN_OFF);
    summary
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
