use serde::{Deserialize, Serialize};

use tubechat_types::llm::{ChatMessage, ProviderKind, Role};

use crate::error::LlmError;
use crate::provider::{GenerationParams, post_json};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat completions. The system prompt travels inline as the
/// first `system` message.
#[derive(Debug, Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAi {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Self {
        Self {
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    pub(crate) async fn generate(
        &self,
        client: &reqwest::Client,
        messages: &[ChatMessage],
        params: GenerationParams,
    ) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = client.post(url).bearer_auth(&self.api_key);

        let response: OpenAiResponse =
            post_json(ProviderKind::OpenAi, request, &self.request_body(messages, params)).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::provider(ProviderKind::OpenAi, "No response from OpenAI"))
    }

    fn request_body<'a>(&'a self, messages: &'a [ChatMessage], params: GenerationParams) -> OpenAiRequest<'a> {
        OpenAiRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}
