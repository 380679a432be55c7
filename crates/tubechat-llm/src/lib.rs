//! LLM dispatch.
//!
//! Callers hand over a provider-neutral message list; each provider
//! variant converts it into the shape its API expects (OpenAI keeps the
//! system prompt inline, Anthropic takes it as a dedicated field).

mod anthropic;
mod dispatcher;
mod error;
mod openai;
mod provider;

use async_trait::async_trait;

pub use anthropic::Anthropic;
pub use dispatcher::{LlmDispatcher, LlmSettings, ProviderSettings};
pub use error::LlmError;
pub use openai::OpenAi;
pub use provider::{GenerationParams, Provider};
pub use tubechat_types::llm::{ChatMessage, ProviderKind, Role};

/// Text generation against a selected provider. Unset `temperature` and
/// `max_tokens` fall back to the implementation's configured defaults.
#[async_trait]
pub trait Generate: Send + Sync {
    async fn generate(
        &self,
        provider: ProviderKind,
        messages: &[ChatMessage],
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String, LlmError>;
}
