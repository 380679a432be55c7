use thiserror::Error;

use tubechat_types::llm::ProviderKind;

#[derive(Debug, Error)]
pub enum LlmError {
    /// No credential for the selected provider. Raised before any request.
    #[error("{provider} API key not configured")]
    NotConfigured { provider: ProviderKind },

    /// Any failure talking to the provider: transport, status, or payload.
    #[error("{provider} API error: {message}")]
    Provider {
        provider: ProviderKind,
        message: String,
    },
}

impl LlmError {
    pub(crate) fn provider(provider: ProviderKind, message: impl Into<String>) -> Self {
        LlmError::Provider {
            provider,
            message: message.into(),
        }
    }
}
