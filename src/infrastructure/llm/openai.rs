use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use crate::domain::{InvocationOptions, InvocationResult, LlmError, Message, ModelProvider, TokenUsage};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const PROVIDER_NAME: &str = "openai";

/// OpenAI chat completions provider
#[derive(Debug)]
pub struct OpenAiProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    default_model: String,
}

impl<C: HttpClientTrait> OpenAiProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let api_key = api_key.into();
        let auth_header = if api_key.is_empty() {
            String::new()
        } else {
            format!("Bearer {}", api_key)
        };
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
            default_model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, messages: &[Message], options: &InvocationOptions) -> serde_json::Value {
        let messages: Vec<OpenAiMessage> = messages.iter().map(OpenAiMessage::from_domain).collect();

        let mut body = serde_json::json!({
            "model": options.model_or(&self.default_model),
            "messages": messages,
            "stream": false,
        });

        if let Some(temp) = options.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = options.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if let Some(top_p) = options.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }

        if let Some(ref stop) = options.stop_sequences {
            body["stop"] = serde_json::json!(stop);
        }

        body
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<InvocationResult, LlmError> {
        let response: OpenAiResponse = serde_json::from_value(json).map_err(|e| {
            LlmError::invocation(PROVIDER_NAME, format!("Failed to parse response: {}", e))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::invocation(PROVIDER_NAME, "No choices in response"))?;

        let mut result = InvocationResult::new(
            choice.message.content.unwrap_or_default(),
            response.model,
            PROVIDER_NAME,
        );

        if let Some(usage) = response.usage {
            result = result.with_usage(TokenUsage::new(usage.prompt_tokens, usage.completion_tokens));
        }

        Ok(result)
    }
}

#[async_trait]
impl<C: HttpClientTrait> ModelProvider for OpenAiProvider<C> {
    async fn complete(
        &self,
        messages: &[Message],
        options: &InvocationOptions,
    ) -> Result<InvocationResult, LlmError> {
        let body = self.build_request(messages, options);
        let response = self
            .client
            .post_json(&self.chat_completions_url(), self.headers(), &body)
            .await
            .map_err(|e| LlmError::invocation(PROVIDER_NAME, e.to_string()))?;

        self.parse_response(response)
    }

    async fn is_available(&self) -> bool {
        !self.auth_header.is_empty()
    }

    fn available_models(&self) -> Vec<String> {
        ["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-3.5-turbo"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

impl OpenAiMessage {
    fn from_domain(message: &Message) -> Self {
        Self {
            role: message.role().as_str(),
            content: message.content().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api.openai.com/v1/chat/completions";

    fn chat_response(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-123",
            "model": "gpt-4o",
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 8, "total_tokens": 18 }
        })
    }

    #[tokio::test]
    async fn test_openai_complete() {
        let client = MockHttpClient::new().with_response(TEST_URL, chat_response("Hello!"));
        let provider = OpenAiProvider::new(client, "test-api-key");

        let result = provider
            .complete(&[Message::user("Hi")], &InvocationOptions::new())
            .await
            .unwrap();

        assert_eq!(result.content, "Hello!");
        assert_eq!(result.model, "gpt-4o");
        assert_eq!(result.provider, "openai");
        assert_eq!(result.token_usage, Some(TokenUsage::new(10, 8)));
    }

    #[tokio::test]
    async fn test_openai_request_body_carries_options() {
        let client = MockHttpClient::new().with_response(TEST_URL, chat_response("ok"));
        let provider = OpenAiProvider::new(client, "key");

        let options = InvocationOptions::builder()
            .model("gpt-4o")
            .temperature(0.1)
            .max_tokens(64)
            .stop_sequences(vec!["END".to_string()])
            .build();

        provider
            .complete(&[Message::system("sys"), Message::user("Hi")], &options)
            .await
            .unwrap();

        let body = provider.client.last_body().unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(body["stop"][0], "END");
        assert_eq!(body["messages"][0]["role"], "system");
    }

    #[tokio::test]
    async fn test_openai_error_is_typed() {
        let client = MockHttpClient::new().with_error(TEST_URL, "API key invalid");
        let provider = OpenAiProvider::new(client, "invalid-key");

        let error = provider
            .complete(&[Message::user("Hi")], &InvocationOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(error, LlmError::Invocation { ref provider, .. } if provider == "openai"));
    }

    #[tokio::test]
    async fn test_openai_availability_requires_key() {
        assert!(OpenAiProvider::new(MockHttpClient::new(), "key").is_available().await);
        assert!(!OpenAiProvider::new(MockHttpClient::new(), "").is_available().await);
    }

    #[tokio::test]
    async fn test_openai_custom_base_url() {
        let custom_url = "http://localhost:8080/v1/chat/completions";
        let client = MockHttpClient::new().with_response(custom_url, chat_response("Custom"));
        let provider = OpenAiProvider::with_base_url(client, "test-key", "http://localhost:8080/");

        let result = provider
            .complete(&[Message::user("Test")], &InvocationOptions::new())
            .await
            .unwrap();

        assert_eq!(result.content, "Custom");
    }
}
