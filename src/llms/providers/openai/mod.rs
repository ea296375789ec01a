//! OpenAI provider.
//!
//! Chat Completions API over `reqwest`, with the same retry policy as the
//! Anthropic provider. Any OpenAI-compatible endpoint works through
//! `base_url`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llms::base_llm::{excerpt, BaseLLM, BaseLLMState, LLMMessage};
use crate::llms::LlmError;

const PROVIDER: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// OpenAI Chat Completions provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAICompletion {
    #[serde(flatten)]
    pub state: BaseLLMState,

    /// Request timeout in seconds.
    pub timeout: Option<f64>,
    pub max_retries: u32,
    pub max_tokens: Option<u32>,
}

impl OpenAICompletion {
    /// Create a new OpenAI completion provider.
    ///
    /// `api_key` defaults to the `OPENAI_API_KEY` environment variable.
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
            max_tokens: None,
        })
    }

    /// Get the API base URL.
    pub fn api_base_url(&self) -> &str {
        self.state.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn build_request_body(&self, messages: &[LLMMessage]) -> Value {
        let mut body = serde_json::json!({
            "model": self.state.model,
            "messages": messages,
        });

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    /// Text of the first choice.
    fn parse_response(&self, response: &Value) -> Result<String, LlmError> {
        let message = response
            .pointer("/choices/0/message")
            .ok_or_else(|| LlmError::MalformedResponse("no choices in OpenAI response".to_string()))?;

        let content = message.get("content").and_then(|c| c.as_str()).unwrap_or("");

        if let Some(usage) = response.get("usage") {
            log::debug!(
                "OpenAI token usage: prompt={}, completion={}, total={}",
                usage.get("prompt_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
                usage.get("completion_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
                usage.get("total_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
            );
        }

        Ok(content.to_string())
    }
}

#[async_trait]
impl BaseLLM for OpenAICompletion {
    fn model(&self) -> &str {
        &self.state.model
    }

    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn acall(&self, messages: Vec<LLMMessage>) -> Result<String, LlmError> {
        log::debug!(
            "OpenAICompletion.acall: model={}, messages={}",
            self.state.model,
            messages.len(),
        );

        let api_key = self.state.api_key.as_ref().ok_or(LlmError::MissingApiKey {
            provider: PROVIDER,
            env_var: API_KEY_ENV,
        })?;

        let body = self.build_request_body(&messages);
        let endpoint = format!("{}/chat/completions", self.api_base_url());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(self.timeout.unwrap_or(120.0)))
            .build()?;

        let mut last_error: Option<LlmError> = None;
        let mut retry_delay = Duration::from_secs(1);

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                log::warn!("OpenAI API retry attempt {} after {:?}", attempt, retry_delay);
                tokio::time::sleep(retry_delay).await;
                retry_delay *= 2;
            }

            let response = match client
                .post(&endpoint)
                .header("Authorization", format!("Bearer {}", api_key))
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

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
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
                    "failed to parse OpenAI response: {} - body: {}",
                    e,
                    excerpt(&response_text, 500)
                ))
            })?;

            return self.parse_response(&response_json);
        }

        Err(last_error.unwrap_or(LlmError::RetriesExhausted { provider: PROVIDER }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAICompletion {
        OpenAICompletion::new("gpt-4o-mini", Some("test-key".to_string()), None).unwrap()
    }

    #[test]
    fn test_openai_new() {
        let provider = provider();
        assert_eq!(provider.state.model, "gpt-4o-mini");
        assert_eq!(provider.state.provider, "openai");
        assert_eq!(provider.api_base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_build_request_body_keeps_system_inline() {
        let mut provider = provider();
        provider.max_tokens = Some(256);
        let body = provider.build_request_body(&[
            LLMMessage::system("Be brief."),
            LLMMessage::user("Hi"),
        ]);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hi");
        assert_eq!(body["max_tokens"], 256);
    }

    #[test]
    fn test_parse_response() {
        let response = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello!"}}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        });
        assert_eq!(provider().parse_response(&response).unwrap(), "Hello!");

        let err = provider().parse_response(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    /// Integration test, requires OPENAI_API_KEY.
    #[tokio::test]
    #[ignore]
    async fn test_openai_real_call() {
        let provider = OpenAICompletion::new("gpt-4o-mini", None, None).unwrap();
        let result = provider.acall(vec![LLMMessage::user("Say hello in exactly 3 words.")]).await;
        assert!(result.is_ok(), "Failed: {:?}", result.err());
    }
}
