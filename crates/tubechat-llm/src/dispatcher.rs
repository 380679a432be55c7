use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use tubechat_types::llm::{ChatMessage, ProviderKind};

use crate::Generate;
use crate::anthropic::Anthropic;
use crate::error::LlmError;
use crate::openai::OpenAi;
use crate::provider::{GenerationParams, Provider};

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// `None` or an empty key leaves the provider unconfigured.
    pub api_key: Option<String>,
    pub model: String,
    /// Override for proxies and tests; the public endpoint otherwise.
    pub base_url: Option<String>,
}

impl ProviderSettings {
    fn key(&self) -> Option<String> {
        self.api_key.clone().filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub openai: ProviderSettings,
    pub anthropic: ProviderSettings,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Applied to every provider request.
    pub timeout: Duration,
}

/// Routes a message list to the selected provider.
pub struct LlmDispatcher {
    client: reqwest::Client,
    openai: Option<Provider>,
    anthropic: Option<Provider>,
    defaults: GenerationParams,
}

impl LlmDispatcher {
    pub fn new(settings: &LlmSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(settings.timeout).build()?;

        let openai = settings.openai.key().map(|key| {
            Provider::OpenAi(OpenAi::new(
                key,
                settings.openai.model.clone(),
                settings.openai.base_url.clone(),
            ))
        });
        let anthropic = settings.anthropic.key().map(|key| {
            Provider::Anthropic(Anthropic::new(
                key,
                settings.anthropic.model.clone(),
                settings.anthropic.base_url.clone(),
            ))
        });

        for (kind, provider) in [
            (ProviderKind::OpenAi, &openai),
            (ProviderKind::Anthropic, &anthropic),
        ] {
            if provider.is_some() {
                info!("LLM provider {} configured", kind);
            } else {
                info!("LLM provider {} not configured (no API key)", kind);
            }
        }

        Ok(Self {
            client,
            openai,
            anthropic,
            defaults: GenerationParams {
                temperature: settings.temperature,
                max_tokens: settings.max_tokens,
            },
        })
    }

    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        self.provider(kind).is_ok()
    }

    fn provider(&self, kind: ProviderKind) -> Result<&Provider, LlmError> {
        let slot = match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
        };
        slot.as_ref().ok_or(LlmError::NotConfigured { provider: kind })
    }

    fn params(&self, temperature: Option<f32>, max_tokens: Option<u32>) -> GenerationParams {
        GenerationParams {
            temperature: temperature.unwrap_or(self.defaults.temperature),
            max_tokens: max_tokens.unwrap_or(self.defaults.max_tokens),
        }
    }
}

#[async_trait]
impl Generate for LlmDispatcher {
    async fn generate(
        &self,
        provider: ProviderKind,
        messages: &[ChatMessage],
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String, LlmError> {
        let provider = self.provider(provider)?;
        provider
            .generate(&self.client, messages, self.params(temperature, max_tokens))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(openai_key: Option<&str>, anthropic_key: Option<&str>) -> LlmSettings {
        LlmSettings {
            openai: ProviderSettings {
                api_key: openai_key.map(String::from),
                model: "gpt-4o-mini".into(),
                // Unroutable: a request reaching the network would fail loudly.
                base_url: Some("http://127.0.0.1:9".into()),
            },
            anthropic: ProviderSettings {
                api_key: anthropic_key.map(String::from),
                model: "claude-3-5-sonnet-20241022".into(),
                base_url: Some("http://127.0.0.1:9".into()),
            },
            temperature: 0.7,
            max_tokens: 2000,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn unconfigured_provider_fails_before_any_request() {
        let dispatcher = LlmDispatcher::new(&settings(Some("sk-test"), None)).unwrap();

        let err = dispatcher
            .generate(ProviderKind::Anthropic, &[ChatMessage::user("hi")], None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LlmError::NotConfigured {
                provider: ProviderKind::Anthropic
            }
        ));
        assert_eq!(err.to_string(), "Anthropic API key not configured");
    }

    #[test]
    fn blank_key_counts_as_unconfigured() {
        let dispatcher = LlmDispatcher::new(&settings(Some("  "), Some("key"))).unwrap();
        assert!(!dispatcher.is_configured(ProviderKind::OpenAi));
        assert!(dispatcher.is_configured(ProviderKind::Anthropic));
    }

    #[test]
    fn unset_params_use_defaults() {
        let dispatcher = LlmDispatcher::new(&settings(None, None)).unwrap();
        assert_eq!(
            dispatcher.params(None, None),
            GenerationParams {
                temperature: 0.7,
                max_tokens: 2000
            }
        );
        assert_eq!(
            dispatcher.params(Some(0.1), Some(5)),
            GenerationParams {
                temperature: 0.1,
                max_tokens: 5
            }
        );
    }

    #[tokio::test]
    async fn transport_failure_is_wrapped_with_provider_name() {
        let dispatcher = LlmDispatcher::new(&settings(Some("sk-test"), None)).unwrap();

        let err = dispatcher
            .generate(ProviderKind::OpenAi, &[ChatMessage::user("hi")], None, None)
            .await
            .unwrap_err();
        match err {
            LlmError::Provider { provider, message } => {
                assert_eq!(provider, ProviderKind::OpenAi);
                assert!(message.starts_with("Network error"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
