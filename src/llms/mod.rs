//! Text generation for panel units.
//!
//! - [`base_llm`] - The base trait for provider-backed models
//! - [`providers`] - Anthropic and OpenAI implementations
//!
//! The pipeline itself only sees [`TextGenerator`]: a prompt plus the
//! ordered outputs of the unit's dependencies go in, text comes out.
//! [`LlmGenerator`] bridges any [`BaseLLM`] to that seam and
//! [`GeneratorSet`] picks the generator for a unit's owner.

pub mod base_llm;
pub mod providers;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::PanelConfig;
use crate::specialists::{SpecialistRegistry, COORDINATOR_ID};

pub use base_llm::{BaseLLM, BaseLLMState, LLMMessage};
pub use providers::{AnthropicCompletion, OpenAICompletion};

/// Separator between dependency outputs in a unit's context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Failures of the generation backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider} API key not set; set {env_var} or pass api_key to the constructor")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{provider} API returned HTTP {status}{}", body_suffix(.body))]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("{provider} API call failed after all retries")]
    RetriesExhausted { provider: &'static str },

    #[error("unknown LLM provider '{0}'")]
    UnknownProvider(String),

    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// Raised by non-provider generators such as test doubles.
    #[error("{0}")]
    Other(String),
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {}", body)
    }
}

/// The capability every unit is executed against.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt`, given the outputs of the unit's
    /// dependencies in declared order.
    async fn generate(&self, prompt: &str, context: &[String]) -> Result<String, LlmError>;
}

/// Create a provider from a model string such as
/// `anthropic/claude-3-5-haiku-latest`, `openai/gpt-4o-mini` or `gpt-4o-mini`.
pub fn create_llm(model: &str) -> Result<Box<dyn BaseLLM>, LlmError> {
    let (provider, name) = BaseLLMState::split_model(model.trim());
    log::debug!("Creating LLM instance: provider={}, model={}", provider, name);

    match provider.as_str() {
        "anthropic" | "claude" => Ok(Box::new(AnthropicCompletion::new(name, None, None)?)),
        "openai" => Ok(Box::new(OpenAICompletion::new(name, None, None)?)),
        other => Err(LlmError::UnknownProvider(other.to_string())),
    }
}

/// Adapts a [`BaseLLM`] to [`TextGenerator`].
///
/// Each unit becomes a single user message: the prompt, then a `Context:`
/// block with the dependency outputs joined by [`CONTEXT_SEPARATOR`].
#[derive(Debug)]
pub struct LlmGenerator {
    llm: Box<dyn BaseLLM>,
}

impl LlmGenerator {
    pub fn new(llm: Box<dyn BaseLLM>) -> Self {
        Self { llm }
    }

    pub fn from_model(model: &str) -> Result<Self, LlmError> {
        create_llm(model).map(Self::new)
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }
}

/// The user message sent for one unit.
pub fn compose_message(prompt: &str, context: &[String]) -> String {
    if context.is_empty() {
        prompt.to_string()
    } else {
        format!("{}\n\nContext:\n{}", prompt, context.join(CONTEXT_SEPARATOR))
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn generate(&self, prompt: &str, context: &[String]) -> Result<String, LlmError> {
        let content = compose_message(prompt, context);
        self.llm.acall(vec![LLMMessage::user(content)]).await
    }
}

/// Default generator plus per-owner overrides. Read-only during a run.
#[derive(Clone)]
pub struct GeneratorSet {
    default: Arc<dyn TextGenerator>,
    overrides: HashMap<String, Arc<dyn TextGenerator>>,
}

impl GeneratorSet {
    pub fn new(default: Arc<dyn TextGenerator>) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    /// Route units owned by `owner` (a specialist id or `coordinator`) to `generator`.
    pub fn with_override(mut self, owner: impl Into<String>, generator: Arc<dyn TextGenerator>) -> Self {
        self.overrides.insert(owner.into(), generator);
        self
    }

    /// Providers for the configured default model and every `llm` override
    /// in the registry.
    pub fn from_config(config: &PanelConfig, registry: &SpecialistRegistry) -> Result<Self, LlmError> {
        let mut set = Self::new(Arc::new(LlmGenerator::from_model(&config.llm_model)?));

        if let Some(model) = &registry.coordinator().llm {
            set = set.with_override(COORDINATOR_ID, Arc::new(LlmGenerator::from_model(model)?));
        }
        for profile in registry.iter() {
            if let Some(model) = &profile.llm {
                log::debug!("Specialist '{}' uses model {}", profile.id, model);
                set = set.with_override(profile.id.clone(), Arc::new(LlmGenerator::from_model(model)?));
            }
        }
        Ok(set)
    }

    pub fn for_owner(&self, owner: &str) -> &dyn TextGenerator {
        self.overrides
            .get(owner)
            .unwrap_or(&self.default)
            .as_ref()
    }

    pub fn has_override(&self, owner: &str) -> bool {
        self.overrides.contains_key(owner)
    }
}

impl std::fmt::Debug for GeneratorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorSet")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}
