//! Completion service abstraction and the OpenRouter-backed implementation.
//!
//! The pipelines never talk to an LLM API directly; they go through
//! [`CompletionModel`], which turns a prompt plus a JSON context object into
//! a JSON-decoded result. Tests substitute scripted fakes.
//!
//! # Retry Strategy
//!
//! The OpenRouter client retries transient errors with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! # Parse Contract
//!
//! A completion that arrives but cannot be parsed as JSON (or is empty)
//! yields an empty object, not an error. Callers that need stronger
//! guarantees validate the object themselves — see the asymmetry between
//! the analyzer (treats an empty object as "no signal") and the generator
//! (treats it as a failed operation).

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::LlmConfig;

/// Per-call parameters for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier (e.g. `"google/gemini-2.5-flash"`).
    pub model: String,
    pub temperature: f64,
}

/// A service that turns a prompt + context object into structured JSON.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Request a strict-JSON completion.
    ///
    /// The context object is appended to the prompt as pretty-printed JSON.
    /// Returns `Err` only for transport-level failure (after retries); a
    /// malformed completion body returns `Ok(json!({}))`.
    async fn generate_json(
        &self,
        prompt: &str,
        context: &Value,
        request: &CompletionRequest,
    ) -> Result<Value>;
}

/// Completion client for the OpenRouter chat-completions API.
///
/// Requires the `OPENROUTER_API_KEY` environment variable.
pub struct OpenRouterClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OpenRouterClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if std::env::var("OPENROUTER_API_KEY").is_err() {
            bail!("OPENROUTER_API_KEY environment variable not set");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    async fn send_once(&self, body: &Value) -> reqwest::Result<reqwest::Response> {
        let api_key = std::env::var("OPENROUTER_API_KEY").unwrap_or_default();
        self.client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
    }
}

#[async_trait]
impl CompletionModel for OpenRouterClient {
    async fn generate_json(
        &self,
        prompt: &str,
        context: &Value,
        request: &CompletionRequest,
    ) -> Result<Value> {
        let content = format!(
            "{}\n\n{}",
            prompt,
            serde_json::to_string_pretty(context).unwrap_or_else(|_| "{}".to_string())
        );

        let body = serde_json::json!({
            "model": request.model,
            "messages": [{ "role": "user", "content": content }],
            "response_format": { "type": "json_object" },
            "temperature": request.temperature,
        });

        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            match self.send_once(&body).await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response.json().await?;
                        return Ok(extract_message_json(&json));
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "completion API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("completion API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("completion failed after retries")))
    }
}

/// Pull the assistant message content out of a chat-completions response and
/// parse it as JSON. Anything malformed collapses to an empty object.
fn extract_message_json(response: &Value) -> Value {
    let content = response
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or("");

    serde_json::from_str(content).unwrap_or_else(|_| serde_json::json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_json_object_from_message_content() {
        let response = json!({
            "choices": [{ "message": { "content": "{\"relevance\": 9}" } }]
        });
        let parsed = extract_message_json(&response);
        assert_eq!(parsed["relevance"], 9);
    }

    #[test]
    fn malformed_content_collapses_to_empty_object() {
        let response = json!({
            "choices": [{ "message": { "content": "sorry, I can't do JSON" } }]
        });
        assert_eq!(extract_message_json(&response), json!({}));
    }

    #[test]
    fn missing_choices_collapses_to_empty_object() {
        assert_eq!(extract_message_json(&json!({})), json!({}));
    }

    #[test]
    fn empty_content_collapses_to_empty_object() {
        let response = json!({
            "choices": [{ "message": { "content": "" } }]
        });
        assert_eq!(extract_message_json(&response), json!({}));
    }
}
