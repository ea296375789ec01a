//! Base trait and shared state for provider-backed language models.
//!
//! Provides the abstract base trait for all LLM implementations, including
//! common functionality for native implementations such as message
//! formatting and provider extraction.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::LlmError;

/// Provider assumed when a model string names none.
pub const DEFAULT_PROVIDER: &str = "openai";

// ---------------------------------------------------------------------------
// LLM Message
// ---------------------------------------------------------------------------

/// A single message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LLMMessage {
    pub role: String,
    pub content: String,
}

impl LLMMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// BaseLLM trait
// ---------------------------------------------------------------------------

/// Abstract base trait for LLM implementations.
///
/// Implementations should handle error cases themselves, including timeouts,
/// authentication failures and malformed responses, and surface them as
/// [`LlmError`].
#[async_trait]
pub trait BaseLLM: Send + Sync + fmt::Debug {
    /// Get the model identifier/name.
    fn model(&self) -> &str;

    /// Get the provider name.
    fn provider(&self) -> &str {
        DEFAULT_PROVIDER
    }

    /// Send the conversation and return the text of the reply.
    async fn acall(&self, messages: Vec<LLMMessage>) -> Result<String, LlmError>;
}

// ---------------------------------------------------------------------------
// BaseLLMState - shared state for LLM implementations
// ---------------------------------------------------------------------------

/// Shared state for LLM implementations.
///
/// Concrete providers embed this and delegate their accessors to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseLLMState {
    /// The model identifier/name.
    pub model: String,
    /// Optional API key.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Optional base URL for the API.
    pub base_url: Option<String>,
    /// Provider name (e.g., "openai", "anthropic").
    pub provider: String,
}

impl BaseLLMState {
    /// Create a new `BaseLLMState` with the given model name.
    pub fn new(model: impl Into<String>) -> Result<Self, LlmError> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(LlmError::InvalidModel("model name is required and cannot be empty".to_string()));
        }

        Ok(Self {
            model,
            api_key: None,
            base_url: None,
            provider: DEFAULT_PROVIDER.to_string(),
        })
    }

    // --- Message formatting ---

    /// Split system messages out of a conversation.
    ///
    /// Multiple system messages are joined with a blank line.
    pub fn split_system(messages: &[LLMMessage]) -> (Option<String>, Vec<&LLMMessage>) {
        let (system, rest): (Vec<&LLMMessage>, Vec<&LLMMessage>) =
            messages.iter().partition(|m| m.role == "system");

        let system = (!system.is_empty()).then(|| {
            system
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        });
        (system, rest)
    }

    // --- Provider utilities ---

    /// Split a model string into provider and model.
    ///
    /// `anthropic/claude-3-5-haiku-latest` names its provider explicitly.
    /// Bare names are inferred: `claude*` is Anthropic, anything else OpenAI.
    pub fn split_model(model: &str) -> (String, String) {
        if let Some((prefix, name)) = model.split_once('/') {
            return (prefix.to_lowercase(), name.to_string());
        }
        let provider = if model.to_lowercase().starts_with("claude") {
            "anthropic"
        } else {
            DEFAULT_PROVIDER
        };
        (provider.to_string(), model.to_string())
    }
}

/// First `max` characters of `text`, for log and error messages.
pub(crate) fn excerpt(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
