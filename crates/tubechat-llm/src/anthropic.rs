use serde::{Deserialize, Serialize};

use tubechat_types::llm::{ChatMessage, ProviderKind, Role};

use crate::error::LlmError;
use crate::provider::{GenerationParams, post_json};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// Anthropic messages API. System entries are lifted out of the message
/// list into the request's `system` field.
#[derive(Debug, Clone)]
pub struct Anthropic {
    api_key: String,
    model: String,
    base_url: String,
}

impl Anthropic {
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
        let url = format!("{}/messages", self.base_url.trim_end_matches('/'));
        let request = client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION);

        let response: AnthropicResponse =
            post_json(ProviderKind::Anthropic, request, &self.request_body(messages, params)).await?;

        let text: Vec<String> = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(LlmError::provider(ProviderKind::Anthropic, "No response from Anthropic"));
        }
        Ok(text.concat())
    }

    fn request_body<'a>(&'a self, messages: &'a [ChatMessage], params: GenerationParams) -> AnthropicRequest<'a> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        AnthropicRequest {
            model: &self.model,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| AnthropicMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> Anthropic {
        Anthropic::new("key".into(), "claude-3-5-sonnet-20241022".into(), None)
    }

    const PARAMS: GenerationParams = GenerationParams {
        temperature: 0.25,
        max_tokens: 100,
    };

    #[test]
    fn system_prompt_moves_to_dedicated_field() {
        let messages = vec![
            ChatMessage::system("sp"),
            ChatMessage::assistant("hi"),
            ChatMessage::user("bye"),
        ];

        let body = serde_json::to_value(provider().request_body(&messages, PARAMS)).unwrap();
        assert_eq!(body["system"], "sp");
        assert_eq!(
            body["messages"],
            serde_json::json!([
                {"role": "assistant", "content": "hi"},
                {"role": "user", "content": "bye"},
            ])
        );
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["temperature"], 0.25);
    }

    #[test]
    fn no_system_field_without_system_prompt() {
        let messages = vec![ChatMessage::user("hello")];
        let body = serde_json::to_value(provider().request_body(&messages, PARAMS)).unwrap();
        assert!(body.get("system").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn text_blocks_are_parsed() {
        let raw = r#"{"content":[{"type":"text","text":"Hello"}],"stop_reason":"end_turn"}"#;
        let parsed: AnthropicResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.content[0].text.as_deref(), Some("Hello"));
    }
}
