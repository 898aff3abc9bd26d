//! Turning analysis action items into tasks.

use crate::pipeline::analysis::{Analysis, ERROR_TAG};
use crate::pipeline::classifier::message_key;
use crate::pipeline::types::NormalizedMessage;

use super::model::{NewTask, TaskPriority, TaskSource};

/// One `NewTask` per non-blank action item, linked back to `message`.
///
/// Degraded analyses promote nothing. Tasks inherit the analysis tags minus
/// the error marker, and a priority mapped from the message priority.
pub fn promote_action_items(message: &NormalizedMessage, analysis: &Analysis) -> Vec<NewTask> {
    if analysis.is_degraded() {
        return Vec::new();
    }

    let source = TaskSource::new(message.source.into(), &message.title, message_key(message));
    let priority = TaskPriority::from_message_priority(analysis.priority);
    let tags: Vec<&String> = analysis.tags.iter().filter(|t| *t != ERROR_TAG).collect();

    analysis
        .action_items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| {
            NewTask::new(item, priority, source.clone())
                .with_description(analysis.summary.clone())
                .with_tags(tags.iter().map(|t| t.as_str()))
        })
        .collect()
}
