use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::providers::ProviderError;
use crate::traits::{GenerationOptions, TextGenerator};

/// Text generator backed by the Gemini `generateContent` endpoint.
pub struct GeminiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(
        api_key: &str,
        model: &str,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = crate::providers::build_http_client(timeout)?;
        let base_url = base_url
            .unwrap_or("https://generativelanguage.googleapis.com/v1beta")
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn build_request_body(prompt: &str, options: &GenerationOptions) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": options.temperature,
                "maxOutputTokens": options.max_output_tokens,
            }
        })
    }

    /// Pull the candidate text out of a generateContent response.
    fn parse_response(data: &Value, model: &str) -> Result<String, ProviderError> {
        let Some(candidate) = data["candidates"].get(0) else {
            let block_reason = data
                .get("promptFeedback")
                .and_then(|pf| pf.get("blockReason"))
                .and_then(|v| v.as_str());
            warn!(
                model,
                block_reason = block_reason.unwrap_or(""),
                "Gemini returned no candidates"
            );
            return Err(ProviderError::malformed(match block_reason {
                Some(reason) => format!("no candidates returned (prompt blocked: {})", reason),
                None => "no candidates returned by provider".to_string(),
            }));
        };

        let finish_reason = candidate.get("finishReason").and_then(|v| v.as_str());
        let empty_parts = vec![];
        let parts = candidate["content"]["parts"]
            .as_array()
            .unwrap_or(&empty_parts);

        let mut text = String::new();
        for part in parts {
            // Thinking models emit thought parts (thought: true); those are
            // reasoning, not output.
            let is_thought = part
                .get("thought")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if is_thought {
                continue;
            }
            if let Some(chunk) = part.get("text").and_then(|s| s.as_str()) {
                text.push_str(chunk);
            }
        }

        if text.trim().is_empty() {
            warn!(
                model,
                finish_reason = finish_reason.unwrap_or(""),
                parts = parts.len(),
                "Gemini returned an empty response"
            );
            return Err(ProviderError::malformed(format!(
                "empty response (finishReason={}, parts={})",
                finish_reason.unwrap_or("unknown"),
                parts.len()
            )));
        }

        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> anyhow::Result<String> {
        let body = Self::build_request_body(prompt, options);
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        info!(
            model = %self.model,
            url_prefix = %self.base_url,
            temperature = options.temperature,
            max_output_tokens = options.max_output_tokens,
            prompt_len = prompt.len(),
            "Calling Gemini"
        );

        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let resp = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                error!("Gemini HTTP request failed: {}", e);
                return Err(ProviderError::network(&e).into());
            }
        };

        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            error!("Failed to read response body: {}", e);
            ProviderError::network(&e)
        })?;

        if !status.is_success() {
            error!(status = %status, "Gemini API error: {}", text);
            return Err(ProviderError::from_status(status.as_u16(), &text).into());
        }

        let data: Value = serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse Gemini response JSON: {}", e);
            ProviderError::malformed(format!("JSON parse error: {}", e))
        })?;

        let completion = Self::parse_response(&data, &self.model)?;
        debug!(
            model = %self.model,
            completion_len = completion.len(),
            "Gemini completion received"
        );
        Ok(completion)
    }
}
