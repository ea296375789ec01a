//! Anthropic provider.
//!
//! - Anthropic Messages API with real HTTP calls via `reqwest`
//! - System messages lifted into the separate `system` parameter
//! - Retry with exponential backoff on 429/529/5xx

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llms::base_llm::{excerpt, BaseLLM, BaseLLMState, LLMMessage};
use crate::llms::LlmError;

const PROVIDER: &str = "anthropic";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Anthropic Messages API completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicCompletion {
    /// Shared base LLM state.
    #[serde(flatten)]
    pub state: BaseLLMState,

    /// Request timeout in seconds.
    pub timeout: Option<f64>,
    /// Maximum number of retries.
    pub max_retries: u32,
    /// Maximum tokens in response (required for Anthropic).
    pub max_tokens: u32,
    /// Anthropic API version header.
    pub anthropic_version: String,
}

impl AnthropicCompletion {
    /// Create a new Anthropic completion provider.
    ///
    /// `api_key` defaults to the `ANTHROPIC_API_KEY` environment variable.
    pub fn new(
        model: impl Into<String>,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, LlmError> {
        let mut state = BaseLLMState::new(model)?;
        state.api_key = api_key.or_else(|| std::env::var(API_KEY_ENV).ok());
        state.base_url = base_url;
        state.provider = PROVIDER.to_string();

        Ok(Self {
            state,
            timeout: None,
            max_retries: 2,
            max_tokens: 4096,
            anthropic_version: "2023-06-01".to_string(),
        })
    }

    /// Get the API base URL.
    pub fn api_base_url(&self) -> &str {
        self.state.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Build the request body for the Messages API.
    pub fn build_request_body(&self, messages: &[LLMMessage]) -> Value {
        let (system, conversation) = BaseLLMState::split_system(messages);

        let mut body = serde_json::json!({
            "model": self.state.model,
            "max_tokens": self.max_tokens,
            "messages": conversation
                .iter()
                .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
                .collect::<Vec<_>>(),
        });

        if let Some(system_text) = system {
            body["system"] = Value::String(system_text);
        }

        body
    }

    /// Concatenate the `text` blocks of a response.
    fn parse_response(&self, response: &Value) -> Result<String, LlmError> {
        if response.get("type").and_then(|t| t.as_str()) == Some("error") {
            let message = response
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown Anthropic API error");
            return Err(LlmError::MalformedResponse(format!("Anthropic API error: {}", message)));
        }

        let content = response
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| LlmError::MalformedResponse("no content array in Anthropic response".to_string()))?;

        let text: String = content
            .iter()
            .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
            .collect();

        if let Some(usage) = response.get("usage") {
            log::debug!(
                "Anthropic usage: input_tokens={}, output_tokens={}",
                usage.get("input_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
                usage.get("output_tokens").and_then(|v| v.as_i64()).unwrap_or(0)
            );
        }

        Ok(text)
    }
}

#[async_trait]
impl BaseLLM for AnthropicCompletion {
    fn model(&self) -> &str {
        &self.state.model
    }

    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn acall(&self, messages: Vec<LLMMessage>) -> Result<String, LlmError> {
        log::debug!(
            "AnthropicCompletion.acall: model={}, messages={}",
            self.state.model,
            messages.len(),
        );

        let api_key = self.state.api_key.as_ref().ok_or(LlmError::MissingApiKey {
            provider: PROVIDER,
            env_var: API_KEY_ENV,
        })?;

        let body = self.build_request_body(&messages);
        let endpoint = format!("{}/v1/messages", self.api_base_url());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(self.timeout.unwrap_or(120.0)))
            .build()?;

        let mut last_error: Option<LlmError> = None;
        let mut retry_delay = Duration::from_secs(1);

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                log::warn!("Anthropic API retry attempt {} after {:?}", attempt, retry_delay);
                tokio::time::sleep(retry_delay).await;
                retry_delay *= 2;
            }

            let response = match client
                .post(&endpoint)
                .header("content-type", "application/json")
                .header("x-api-key", api_key.as_str())
                .header("anthropic-version", &self.anthropic_version)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(e.into());
                    continue;
                }
            };

            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if let Some(retry_after) = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                {
                    retry_delay = Duration::from_secs(retry_after);
                }
            }

            // 429 rate limited, 529 overloaded, 5xx server errors
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS
                || status.as_u16() == 529
                || status.is_server_error()
            {
                last_error = Some(LlmError::Status {
                    provider: PROVIDER,
                    status: status.as_u16(),
                    body: String::new(),
                });
                continue;
            }

            let response_text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    last_error = Some(e.into());
                    continue;
                }
            };

            if status.is_client_error() {
                return Err(LlmError::Status {
                    provider: PROVIDER,
                    status: status.as_u16(),
                    body: excerpt(&response_text, 500).to_string(),
                });
            }

            let response_json: Value = serde_json::from_str(&response_text).map_err(|e| {
                LlmError::MalformedResponse(format!(
                    "failed to parse Anthropic response: {} - body: {}",
                    e,
                    excerpt(&response_text, 500)
                ))
            })?;

            return self.parse_response(&response_json);
        }

        Err(last_error.unwrap_or(LlmError::RetriesExhausted { provider: PROVIDER }))
    }
}
