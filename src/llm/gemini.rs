//! Gemini provider using the `v1beta/models/{model}:generateContent` API.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CompletionRequest, CompletionResponse, FinishReason, LlmConfig, LlmProvider};
use crate::error::LlmError;

const PROVIDER: &str = "gemini";

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

// ── Provider ────────────────────────────────────────────────────────

/// Gemini text-generation provider.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    /// Build a provider from configuration.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("Failed to build HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

/// Translate a completion request into the Gemini request body: one user
/// turn carrying the prompt.
pub(crate) fn build_request(request: &CompletionRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(request.prompt.clone()),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
            response_mime_type: request
                .json_output
                .then(|| "application/json".to_string()),
        },
    }
}

fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("STOP") | None => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::Length,
        Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") => FinishReason::Safety,
        Some(_) => FinishReason::Other,
    }
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = build_request(&request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited {
                provider: PROVIDER.to_string(),
                retry_after: parse_retry_after(response.headers()),
            });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(LlmError::AuthFailed {
                provider: PROVIDER.to_string(),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let reason = format!("HTTP {}: {}", status.as_u16(), text);
            return Err(if status.is_server_error() {
                LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason,
                }
            } else {
                LlmError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    reason,
                }
            });
        }

        let raw = response.text().await.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })?;
        let parsed: GenerateContentResponse = serde_json::from_str(&raw)?;

        let candidate = parsed.candidates.into_iter().next();
        let finish_reason = map_finish_reason(
            candidate
                .as_ref()
                .and_then(|c| c.finish_reason.as_deref()),
        );

        // Missing candidates or parts yield empty text, same as a model
        // that answered with nothing useful.
        let content = candidate
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        debug!(
            model = %self.model,
            finish_reason = ?finish_reason,
            chars = content.len(),
            "Gemini completion finished"
        );

        Ok(CompletionResponse {
            content,
            finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_request_maps_prompt_and_generation_config() {
        let request = CompletionRequest::new("classify this")
            .with_temperature(0.2)
            .with_max_tokens(800);

        let json = serde_json::to_value(build_request(&request)).unwrap();

        assert_eq!(json["contents"].as_array().unwrap().len(), 1);
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "classify this");
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 800);
        assert!(json["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn build_request_omits_unset_generation_fields() {
        let json = serde_json::to_value(build_request(&CompletionRequest::new("hi"))).unwrap();
        assert!(json["generationConfig"].get("temperature").is_none());
        assert!(json["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn json_output_sets_mime_type() {
        let request = CompletionRequest::new("hi").with_json_output(true);
        let json = serde_json::to_value(build_request(&request)).unwrap();
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn finish_reason_mapping() {
        assert_eq!(map_finish_reason(Some("STOP")), FinishReason::Stop);
        assert_eq!(map_finish_reason(None), FinishReason::Stop);
        assert_eq!(map_finish_reason(Some("MAX_TOKENS")), FinishReason::Length);
        assert_eq!(map_finish_reason(Some("SAFETY")), FinishReason::Safety);
        assert_eq!(map_finish_reason(Some("OTHER")), FinishReason::Other);
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let provider = GeminiProvider::new(&LlmConfig {
            api_key: SecretString::from("k"),
            model: "gemini-pro".into(),
            base_url: "http://127.0.0.1:9999/".into(),
            timeout: None,
        })
        .unwrap();
        assert_eq!(
            provider.endpoint(),
            "http://127.0.0.1:9999/v1beta/models/gemini-pro:generateContent"
        );
    }
}
