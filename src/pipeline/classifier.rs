//! Priority classifier: asks the model for a JSON verdict and coerces it
//! into an `Analysis`.
//!
//! Flow per message:
//! 1. Render the fixed prompt from the normalized message
//! 2. One provider call (low temperature, bounded output), retried per policy
//! 3. Pull the first `{...}` span out of the free text
//! 4. Parse and normalize into `Analysis`
//!
//! **Failure contract:** under `FailurePolicy::Degrade` (the default) callers
//! always receive an `Analysis`. Failures in steps 2-4 produce
//! `Analysis::degraded()` and are only logged.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use rand::Rng;
use regex::Regex;
use tracing::{debug, info, warn};

use super::analysis::Analysis;
use super::throttle::CallSpacing;
use super::types::{MessageSource, NormalizedMessage};
use crate::error::ClassificationError;
use crate::llm::retry::{RetryPolicy, with_retry};
use crate::llm::{CompletionRequest, FinishReason, LlmProvider};

/// Longest body excerpt placed into the prompt, in characters.
const MAX_BODY_CHARS: usize = 8_000;

/// First `{` through last `}`, across newlines.
static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// What to do when a single-message classification fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log and return `Analysis::degraded()`.
    #[default]
    Degrade,
    /// Hand the `ClassificationError` to the caller.
    Propagate,
}

/// Classifier tuning.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Ask the provider for `application/json` output.
    pub json_output: bool,
    pub failure_policy: FailurePolicy,
    pub retry: RetryPolicy,
    /// Pause after each batch call before the next one starts.
    pub batch_interval: Duration,
    /// Batch calls allowed in flight at once.
    pub batch_concurrency: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: 800,
            json_output: false,
            failure_policy: FailurePolicy::Degrade,
            retry: RetryPolicy::default(),
            batch_interval: Duration::from_millis(500),
            batch_concurrency: 1,
        }
    }
}

/// Classifies normalized messages through an LLM provider.
pub struct MessageClassifier {
    llm: Arc<dyn LlmProvider>,
    config: ClassifierConfig,
    spacing: CallSpacing,
}

impl MessageClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>, config: ClassifierConfig) -> Self {
        let spacing = CallSpacing::new(config.batch_interval);
        Self {
            llm,
            config,
            spacing,
        }
    }

    /// Classify one message, surfacing every failure.
    pub async fn classify(
        &self,
        message: &NormalizedMessage,
    ) -> Result<Analysis, ClassificationError> {
        let request = CompletionRequest::new(build_analysis_prompt(message))
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_output_tokens)
            .with_json_output(self.config.json_output);

        let response =
            with_retry(&self.config.retry, || self.llm.complete(request.clone())).await?;

        if response.finish_reason == FinishReason::Length {
            debug!(raw_response = %response.content, "Classifier output hit the token limit");
            return Err(ClassificationError::Truncated);
        }

        let analysis = parse_analysis(&response.content).inspect_err(|e| {
            debug!(raw_response = %response.content, error = %e, "Unusable classifier output");
        })?;

        debug!(
            id = message.id.as_deref().unwrap_or("-"),
            priority = %analysis.priority,
            action_items = analysis.action_items.len(),
            "Message classified"
        );
        Ok(analysis)
    }

    /// Classify one message, applying the configured failure policy.
    ///
    /// With `FailurePolicy::Degrade` this never returns `Err`.
    pub async fn analyze(
        &self,
        message: &NormalizedMessage,
    ) -> Result<Analysis, ClassificationError> {
        match self.classify(message).await {
            Ok(analysis) => Ok(analysis),
            Err(e) => match self.config.failure_policy {
                FailurePolicy::Degrade => {
                    warn!(
                        id = message.id.as_deref().unwrap_or("-"),
                        error = %e,
                        "Classification failed, returning degraded analysis"
                    );
                    Ok(Analysis::degraded())
                }
                FailurePolicy::Propagate => Err(e),
            },
        }
    }

    /// Classify many messages, returning `(id, analysis)` pairs in input order.
    ///
    /// Each call is followed by a `batch_interval` pause before the next one
    /// starts, with at most `batch_concurrency` in flight. A failed item is
    /// degraded on its own and never aborts the batch, whatever the failure
    /// policy. Messages without an id get a synthesized one that is not stable
    /// across runs. A duplicate id keeps its first position and the later
    /// result.
    pub async fn analyze_batch(&self, messages: &[NormalizedMessage]) -> Vec<(String, Analysis)> {
        let total = messages.len();
        info!(count = total, "Analyzing message batch");

        let mut pending: Vec<BoxFuture<'_, (String, Analysis)>> = Vec::with_capacity(total);
        for message in messages {
            pending.push(self.analyze_batch_item(message).boxed());
        }
        let results: Vec<(String, Analysis)> = stream::iter(pending)
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        let mut merged: Vec<(String, Analysis)> = Vec::with_capacity(results.len());
        for (key, analysis) in results {
            match merged.iter_mut().find(|(existing, _)| *existing == key) {
                Some(slot) => slot.1 = analysis,
                None => merged.push((key, analysis)),
            }
        }

        let degraded = merged.iter().filter(|(_, a)| a.is_degraded()).count();
        info!(total, degraded, "Batch analysis complete");
        merged
    }

    async fn analyze_batch_item(&self, message: &NormalizedMessage) -> (String, Analysis) {
        self.spacing.acquire().await;
        let key = message_key(message);
        let result = self.classify(message).await;
        self.spacing.finish().await;

        let analysis = match result {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(id = %key, error = %e, "Batch item failed, degrading");
                Analysis::degraded()
            }
        };
        (key, analysis)
    }
}

/// Stable id if the message has one, otherwise `<source>-<millis>-<random>`.
pub fn message_key(message: &NormalizedMessage) -> String {
    if let Some(id) = message.id.as_deref().filter(|s| !s.trim().is_empty()) {
        return id.to_string();
    }
    let millis = message
        .timestamp
        .as_datetime()
        .unwrap_or_else(Utc::now)
        .timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(8)
        .map(char::from)
        .collect::<String>()
        .to_ascii_lowercase();
    format!("{}-{}-{}", message.source.label(), millis, suffix)
}

// ── Prompt construction ─────────────────────────────────────────────

/// Render the classification prompt for one message.
pub fn build_analysis_prompt(message: &NormalizedMessage) -> String {
    let source = message.source.prompt_label();
    let body: String = message.body.chars().take(MAX_BODY_CHARS).collect();

    let content = match message.source {
        MessageSource::Email => {
            let from = match message.sender_address {
                Some(ref addr) if *addr != message.sender => {
                    format!("{} <{}>", message.sender, addr)
                }
                _ => message.sender.clone(),
            };
            format!(
                "Subject: {}\nFrom: {}\nDate: {}\nBody: {}",
                message.title, from, message.timestamp, body
            )
        }
        MessageSource::Chat => format!(
            "Channel: {}\nDate: {}\nMessage: {}",
            message.title, message.timestamp, body
        ),
    };

    format!(
        "You are an AI assistant analyzing a {source} to determine its priority and action items.\n\n\
         {source} content:\n\
         {content}\n\n\
         Analyze this {source} and respond only with a valid JSON object in the following format:\n\
         {{\n  \
           \"priority\": \"critical\" | \"action\" | \"info\",\n  \
           \"summary\": \"Brief 1-2 sentence summary of the content\",\n  \
           \"actionItems\": [\"List of specific actions to take based on the content\", \"...\"],\n  \
           \"tags\": [\"Relevant topic tags\", \"...\"]\n\
         }}\n\n\
         Priority levels:\n\
         - critical: Urgent matters requiring immediate attention (deadlines within 24 hours, emergencies, critical issues)\n\
         - action: Items requiring a response or action but not urgent (tasks, questions, important information)\n\
         - info: Informational content requiring no immediate action (newsletters, updates, FYI messages)\n\n\
         Ensure the summary captures the essence of the message. Extract concrete, actionable tasks \
         into the actionItems array. Identify 1-5 relevant tags."
    )
}

// ── Response parsing ────────────────────────────────────────────────

/// The first brace-delimited span in the model output, if any.
pub fn extract_json_object(text: &str) -> Option<&str> {
    JSON_OBJECT.find(text).map(|m| m.as_str())
}

/// Extract, parse and normalize a model response.
pub fn parse_analysis(raw: &str) -> Result<Analysis, ClassificationError> {
    let json = extract_json_object(raw).ok_or(ClassificationError::NoJson)?;
    let value: serde_json::Value = serde_json::from_str(json)?;
    Ok(Analysis::from_model_json(&value))
}
