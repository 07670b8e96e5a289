//! Gemini `generateContent` client
//!
//! Sends a single user prompt and concatenates the text parts of the first
//! candidate. The API key travels in the `x-goog-api-key` header so it never
//! shows up in URLs or error messages.

use super::{PlanError, TextModel};
use crate::AgroPlanError;
use crate::config::ModelConfig;
use crate::fetcher::upstream_message;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Hosted Gemini model client
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client from model settings; a missing API key is a configuration error.
    pub fn from_config(config: &ModelConfig) -> Result<Self, AgroPlanError> {
        let api_key = config.resolve_api_key()?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .build()
            .map_err(|e| AgroPlanError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            model: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(&self.model)
        )
    }
}

impl TextModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.len()))]
    fn complete(&self, prompt: &str) -> Result<String, PlanError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }],
        });

        let start_time = Instant::now();
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                warn!("Model request failed: {}", e);
                PlanError::ModelUnavailable(e.without_url().to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| PlanError::ModelUnavailable(e.without_url().to_string()))?;
        debug!("Model responded with HTTP {} in {:.3}s", status, start_time.elapsed().as_secs_f64());

        if status.as_u16() == 429 || status.is_server_error() {
            let message = upstream_message(status.as_u16(), &text);
            warn!("Model unavailable (HTTP {}): {}", status, message);
            return Err(PlanError::ModelUnavailable(format!("HTTP {}: {message}", status.as_u16())));
        }
        if !status.is_success() {
            let message = upstream_message(status.as_u16(), &text);
            error!("Model rejected the request (HTTP {}): {}", status, message);
            return Err(PlanError::GenerationFailure(format!("HTTP {}: {message}", status.as_u16())));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| PlanError::GenerationFailure(format!("unreadable model response: {e}")))?;
        let completion = extract_text(&value)?;

        info!(
            "Received {} characters from {} in {:.3}s",
            completion.len(),
            self.model,
            start_time.elapsed().as_secs_f64()
        );
        Ok(completion)
    }
}

/// Concatenated text parts of the first candidate
pub fn extract_text(value: &Value) -> Result<String, PlanError> {
    if let Some(reason) = value
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(PlanError::GenerationFailure(format!(
            "prompt blocked by the model ({reason})"
        )));
    }

    let text = value
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default();

    Ok(text)
}
