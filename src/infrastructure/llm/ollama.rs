//! Local model runtime provider (Ollama chat API)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http_client::HttpClientTrait;
use crate::domain::{InvocationOptions, InvocationResult, LlmError, Message, ModelProvider, TokenUsage};

const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
const PROVIDER_NAME: &str = "ollama";

/// Provider backed by a locally running Ollama server
#[derive(Debug)]
pub struct OllamaProvider<C: HttpClientTrait> {
    client: C,
    base_url: String,
    default_model: String,
    models: Vec<String>,
}

impl<C: HttpClientTrait> OllamaProvider<C> {
    pub fn new(client: C) -> Self {
        Self::with_base_url(client, DEFAULT_OLLAMA_BASE_URL)
    }

    pub fn with_base_url(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_model: DEFAULT_OLLAMA_MODEL.to_string(),
            models: vec![DEFAULT_OLLAMA_MODEL.to_string()],
        }
    }

    /// Set the default model; it is also added to the advertised model list
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !self.models.contains(&model) {
            self.models.push(model.clone());
        }
        self.default_model = model;
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }

    fn build_request(&self, messages: &[Message], options: &InvocationOptions) -> serde_json::Value {
        let messages: Vec<OllamaMessage> = messages
            .iter()
            .map(|m| OllamaMessage {
                role: m.role().as_str(),
                content: m.content().to_string(),
            })
            .collect();

        let mut model_options = serde_json::Map::new();

        if let Some(temp) = options.temperature {
            model_options.insert("temperature".into(), serde_json::json!(temp));
        }

        if let Some(top_p) = options.top_p {
            model_options.insert("top_p".into(), serde_json::json!(top_p));
        }

        if let Some(max_tokens) = options.max_tokens {
            model_options.insert("num_predict".into(), serde_json::json!(max_tokens));
        }

        if let Some(ref stop) = options.stop_sequences {
            model_options.insert("stop".into(), serde_json::json!(stop));
        }

        serde_json::json!({
            "model": options.model_or(&self.default_model),
            "messages": messages,
            "stream": false,
            "options": model_options,
        })
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<InvocationResult, LlmError> {
        let response: OllamaResponse = serde_json::from_value(json).map_err(|e| {
            LlmError::invocation(PROVIDER_NAME, format!("Failed to parse response: {}", e))
        })?;

        let mut result = InvocationResult::new(response.message.content, response.model, PROVIDER_NAME);

        if let (Some(prompt), Some(completion)) = (response.prompt_eval_count, response.eval_count) {
            result = result.with_usage(TokenUsage::new(prompt, completion));
        }

        Ok(result)
    }
}

#[async_trait]
impl<C: HttpClientTrait> ModelProvider for OllamaProvider<C> {
    async fn complete(
        &self,
        messages: &[Message],
        options: &InvocationOptions,
    ) -> Result<InvocationResult, LlmError> {
        let body = self.build_request(messages, options);
        let response = self
            .client
            .post_json(&self.chat_url(), vec![("Content-Type", "application/json")], &body)
            .await
            .map_err(|e| LlmError::invocation(PROVIDER_NAME, e.to_string()))?;

        self.parse_response(response)
    }

    async fn is_available(&self) -> bool {
        match self.client.get_json(&self.tags_url(), vec![]).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Ollama liveness check failed");
                false
            }
        }
    }

    fn available_models(&self) -> Vec<String> {
        self.models.clone()
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    message: OllamaResponseMessage,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;

    const CHAT_URL: &str = "http://localhost:11434/api/chat";
    const TAGS_URL: &str = "http://localhost:11434/api/tags";

    #[tokio::test]
    async fn test_ollama_complete() {
        let client = MockHttpClient::new().with_response(
            CHAT_URL,
            serde_json::json!({
                "model": "llama3.1",
                "message": {"role": "assistant", "content": "Hi from local"},
                "done": true,
                "prompt_eval_count": 7,
                "eval_count": 4
            }),
        );
        let provider = OllamaProvider::new(client);

        let options = InvocationOptions::builder().temperature(0.0).max_tokens(32).build();
        let result = provider.complete(&[Message::user("Hi")], &options).await.unwrap();

        assert_eq!(result.content, "Hi from local");
        assert_eq!(result.provider, "ollama");
        assert_eq!(result.token_usage, Some(TokenUsage::new(7, 4)));

        let body = provider.client.last_body().unwrap();
        assert_eq!(body["options"]["num_predict"], 32);
        assert_eq!(body["stream"], false);
    }

    #[tokio::test]
    async fn test_ollama_availability_follows_tags_endpoint() {
        let up = OllamaProvider::new(
            MockHttpClient::new().with_response(TAGS_URL, serde_json::json!({"models": []})),
        );
        let down = OllamaProvider::new(MockHttpClient::new().with_error(TAGS_URL, "refused"));

        assert!(up.is_available().await);
        assert!(!down.is_available().await);
    }

    #[test]
    fn test_default_model_is_advertised() {
        let provider = OllamaProvider::new(MockHttpClient::new()).with_default_model("mistral");
        assert_eq!(provider.available_models(), vec!["llama3.1", "mistral"]);
    }
}
