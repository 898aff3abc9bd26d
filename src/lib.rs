//! FlowSync: message triage service.
//!
//! Pulls email and chat messages, normalizes them, classifies each by
//! priority through an LLM, tracks follow-up tasks, and composes a daily
//! briefing. Everything is exposed over a small JSON HTTP API (`api`).

pub mod api;
pub mod briefing;
pub mod config;
pub mod error;
pub mod integrations;
pub mod llm;
pub mod pipeline;
pub mod tasks;

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::api::AppState;
use crate::briefing::delivery::LoggingDelivery;
use crate::briefing::sample::sample_tasks;
use crate::config::FlowSyncConfig;
use crate::integrations::{GmailFetcher, SlackFetcher};
use crate::pipeline::classifier::MessageClassifier;
use crate::tasks::store::InMemoryTaskStore;

/// Wire up the production state: Gemini classifier, in-memory task store,
/// Gmail and Slack fetchers, and the logging briefing delivery.
pub fn build_state(config: &FlowSyncConfig) -> error::Result<AppState> {
    let llm = llm::create_provider(&config.llm)?;
    let classifier = MessageClassifier::new(llm, config.classifier.clone());

    let tasks = if config.server.seed_sample_tasks {
        let seeded = sample_tasks(Utc::now());
        info!(count = seeded.len(), "Seeding sample tasks");
        InMemoryTaskStore::with_tasks(seeded)
    } else {
        InMemoryTaskStore::new()
    };

    let integrations = &config.integrations;
    let email = GmailFetcher::new(&integrations.gmail_base_url, integrations.http_timeout)?;
    let chat = SlackFetcher::new(&integrations.slack_base_url, integrations.http_timeout)?;

    Ok(AppState {
        classifier: Arc::new(classifier),
        tasks: Arc::new(tasks),
        delivery: Arc::new(LoggingDelivery),
        email: Arc::new(email),
        chat: Arc::new(chat),
    })
}
