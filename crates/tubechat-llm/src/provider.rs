use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use tubechat_types::llm::{ChatMessage, ProviderKind};

use crate::anthropic::Anthropic;
use crate::error::LlmError;
use crate::openai::OpenAi;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A configured provider. Every variant exposes the same `generate`
/// capability; provider-specific request shaping stays inside the variant.
#[derive(Debug, Clone)]
pub enum Provider {
    OpenAi(OpenAi),
    Anthropic(Anthropic),
}

impl Provider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::OpenAi(_) => ProviderKind::OpenAi,
            Provider::Anthropic(_) => ProviderKind::Anthropic,
        }
    }

    pub async fn generate(
        &self,
        client: &reqwest::Client,
        messages: &[ChatMessage],
        params: GenerationParams,
    ) -> Result<String, LlmError> {
        debug!(
            "Dispatching {} messages to {} (temperature={}, max_tokens={})",
            messages.len(),
            self.kind(),
            params.temperature,
            params.max_tokens
        );

        let result = match self {
            Provider::OpenAi(p) => p.generate(client, messages, params).await,
            Provider::Anthropic(p) => p.generate(client, messages, params).await,
        };

        if let Err(e) = &result {
            warn!("{}", e);
        }
        result
    }
}

/// POST a JSON body and decode a JSON response, folding every failure
/// into `LlmError::Provider`.
pub(crate) async fn post_json<B, R>(
    provider: ProviderKind,
    request: reqwest::RequestBuilder,
    body: &B,
) -> Result<R, LlmError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| LlmError::provider(provider, format!("Network error: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::provider(provider, format!("{}: {}", status, body)));
    }

    response
        .json::<R>()
        .await
        .map_err(|e| LlmError::provider(provider, format!("Failed to parse response: {}", e)))
}
