use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use crate::domain::{
    InvocationOptions, InvocationResult, LlmError, Message, MessageRole, ModelProvider, TokenUsage,
};

const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-20241022";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const PROVIDER_NAME: &str = "anthropic";

/// Anthropic messages API provider
#[derive(Debug)]
pub struct AnthropicProvider<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl<C: HttpClientTrait> AnthropicProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_ANTHROPIC_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            api_key: api_key.into(),
            base_url,
            default_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn build_request(&self, messages: &[Message], options: &InvocationOptions) -> serde_json::Value {
        let (system, messages) = split_system_messages(messages);

        let anthropic_messages: Vec<AnthropicMessage> =
            messages.into_iter().map(AnthropicMessage::from_domain).collect();

        let mut body = serde_json::json!({
            "model": options.model_or(&self.default_model),
            "messages": anthropic_messages,
            "max_tokens": options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        if let Some(system_content) = system {
            body["system"] = serde_json::json!(system_content);
        }

        if let Some(temp) = options.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(top_p) = options.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }

        if let Some(ref stop) = options.stop_sequences {
            body["stop_sequences"] = serde_json::json!(stop);
        }

        body
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", ANTHROPIC_VERSION),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<InvocationResult, LlmError> {
        let response: AnthropicResponse = serde_json::from_value(json).map_err(|e| {
            LlmError::invocation(PROVIDER_NAME, format!("Failed to parse response: {}", e))
        })?;

        let content = response
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(InvocationResult::new(content, response.model, PROVIDER_NAME).with_usage(
            TokenUsage::new(response.usage.input_tokens, response.usage.output_tokens),
        ))
    }
}

/// System messages go in a separate top-level field, joined by newlines
fn split_system_messages(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
    let mut system_content = String::new();
    let mut other_messages = Vec::new();

    for msg in messages {
        if msg.role() == MessageRole::System {
            if !system_content.is_empty() {
                system_content.push('\n');
            }
            system_content.push_str(msg.content());
        } else {
            other_messages.push(msg);
        }
    }

    let system = if system_content.is_empty() {
        None
    } else {
        Some(system_content)
    };

    (system, other_messages)
}

#[async_trait]
impl<C: HttpClientTrait> ModelProvider for AnthropicProvider<C> {
    async fn complete(
        &self,
        messages: &[Message],
        options: &InvocationOptions,
    ) -> Result<InvocationResult, LlmError> {
        let body = self.build_request(messages, options);
        let response = self
            .client
            .post_json(&self.messages_url(), self.headers(), &body)
            .await
            .map_err(|e| LlmError::invocation(PROVIDER_NAME, e.to_string()))?;

        self.parse_response(response)
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn available_models(&self) -> Vec<String> {
        [
            "claude-sonnet-4-20250514",
            "claude-3-5-sonnet-20241022",
            "claude-3-5-haiku-20241022",
            "claude-3-opus-20240229",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

impl AnthropicMessage {
    fn from_domain(message: &Message) -> Self {
        let role = match message.role() {
            MessageRole::Assistant => "assistant",
            MessageRole::User | MessageRole::System => "user",
        };

        Self {
            role,
            content: message.content().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api.anthropic.com/v1/messages";

    fn messages_response() -> serde_json::Value {
        serde_json::json!({
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-20241022",
            "content": [
                {"type": "text", "text": "Hello! "},
                {"type": "text", "text": "How can I help?"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 10}
        })
    }

    #[tokio::test]
    async fn test_anthropic_complete() {
        let client = MockHttpClient::new().with_response(TEST_URL, messages_response());
        let provider = AnthropicProvider::new(client, "test-api-key");

        let result = provider
            .complete(
                &[Message::system("You are helpful"), Message::user("Hello!")],
                &InvocationOptions::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.content, "Hello! How can I help?");
        assert_eq!(result.provider, "anthropic");
        assert_eq!(result.token_usage.map(|u| u.total), Some(22));
    }

    #[tokio::test]
    async fn test_anthropic_system_messages_are_lifted() {
        let client = MockHttpClient::new().with_response(TEST_URL, messages_response());
        let provider = AnthropicProvider::new(client, "test-key");

        provider
            .complete(
                &[
                    Message::system("System prompt 1"),
                    Message::system("System prompt 2"),
                    Message::user("Hello"),
                ],
                &InvocationOptions::new(),
            )
            .await
            .unwrap();

        let body = provider.client.last_body().unwrap();
        assert_eq!(body["system"], "System prompt 1\nSystem prompt 2");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["max_tokens"], 4096);
    }

    #[tokio::test]
    async fn test_anthropic_error_is_typed() {
        let client = MockHttpClient::new().with_error(TEST_URL, "overloaded");
        let provider = AnthropicProvider::new(client, "key");

        let error = provider
            .complete(&[Message::user("Hi")], &InvocationOptions::new())
            .await
            .unwrap_err();

        assert_eq!(error.provider(), Some("anthropic"));
    }
}
