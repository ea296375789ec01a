//! LLM provider implementations.
//!
//! Each provider implements the [`BaseLLM`](crate::llms::base_llm::BaseLLM)
//! trait and handles authentication, request formatting and error handling
//! specific to that provider.
//!
//! | Provider | Module | Model string |
//! |----------|--------|--------------|
//! | Anthropic | [`anthropic`] | `anthropic/claude-3-5-haiku-latest`, `claude-*` |
//! | OpenAI | [`openai`] | `openai/gpt-4o-mini`, any other bare name |

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicCompletion;
pub use openai::OpenAICompletion;
