use serde::Deserialize;
use std::sync::Arc;

use super::http_client::HttpClient;
use super::{AnthropicProvider, MockProvider, OllamaProvider, OpenAiProvider};
use crate::domain::{LlmError, ModelProvider};
use crate::infrastructure::rate_limit::RateLimitConfig;

/// Which backend a configured provider talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[serde(alias = "open_ai")]
    OpenAi,
    Anthropic,
    Ollama,
    Mock,
}

/// Settings for one provider in the gateway chain
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    /// Name used for rate-limit buckets and error attribution; defaults to the kind
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable to read the API key from when `api_key` is unset
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Canned response, only used by the mock kind
    #[serde(default)]
    pub response: Option<String>,
}

impl ProviderSettings {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            name: None,
            kind,
            api_key: None,
            api_key_env: None,
            base_url: None,
            model: None,
            rate_limit: RateLimitConfig::default(),
            response: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// The name the provider reports as `provider_name`
    pub fn provider_name(&self) -> &str {
        match (&self.name, self.kind) {
            (Some(name), _) => name,
            (None, ProviderKind::OpenAi) => "openai",
            (None, ProviderKind::Anthropic) => "anthropic",
            (None, ProviderKind::Ollama) => "ollama",
            (None, ProviderKind::Mock) => "mock",
        }
    }

    pub(crate) fn resolve_api_key(&self) -> Result<String, LlmError> {
        if let Some(ref key) = self.api_key {
            return Ok(key.clone());
        }

        let Some(ref var) = self.api_key_env else {
            return Err(LlmError::configuration(format!(
                "Provider '{}' requires api_key or api_key_env",
                self.provider_name()
            )));
        };

        std::env::var(var).map_err(|_| {
            LlmError::configuration(format!(
                "Environment variable '{}' for provider '{}' is not set",
                var,
                self.provider_name()
            ))
        })
    }
}

/// Factory for creating model providers from settings
#[derive(Debug)]
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(settings: &ProviderSettings) -> Result<Arc<dyn ModelProvider>, LlmError> {
        let http_client = HttpClient::new();

        match settings.kind {
            ProviderKind::OpenAi => {
                let api_key = settings.resolve_api_key()?;
                let mut provider = match settings.base_url {
                    Some(ref url) => OpenAiProvider::with_base_url(http_client, api_key, url),
                    None => OpenAiProvider::new(http_client, api_key),
                };
                if let Some(ref model) = settings.model {
                    provider = provider.with_default_model(model);
                }
                Ok(Arc::new(provider))
            }

            ProviderKind::Anthropic => {
                let api_key = settings.resolve_api_key()?;
                let mut provider = match settings.base_url {
                    Some(ref url) => AnthropicProvider::with_base_url(http_client, api_key, url),
                    None => AnthropicProvider::new(http_client, api_key),
                };
                if let Some(ref model) = settings.model {
                    provider = provider.with_default_model(model);
                }
                Ok(Arc::new(provider))
            }

            ProviderKind::Ollama => {
                let mut provider = match settings.base_url {
                    Some(ref url) => OllamaProvider::with_base_url(http_client, url),
                    None => OllamaProvider::new(http_client),
                };
                if let Some(ref model) = settings.model {
                    provider = provider.with_default_model(model);
                }
                Ok(Arc::new(provider))
            }

            ProviderKind::Mock => {
                let mut provider = MockProvider::new(settings.provider_name());
                if let Some(ref model) = settings.model {
                    provider = provider.with_model(model);
                }
                if let Some(ref response) = settings.response {
                    provider = provider.with_response(response);
                }
                Ok(Arc::new(provider))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_openai_provider() {
        let settings = ProviderSettings::new(ProviderKind::OpenAi).with_api_key("sk-test");
        let provider = ProviderFactory::create(&settings).unwrap();
        assert_eq!(provider.provider_name(), "openai");
    }

    #[test]
    fn test_create_anthropic_provider() {
        let settings = ProviderSettings::new(ProviderKind::Anthropic)
            .with_api_key("sk-ant-test")
            .with_model("claude-3-opus-20240229");
        let provider = ProviderFactory::create(&settings).unwrap();
        assert_eq!(provider.provider_name(), "anthropic");
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let settings = ProviderSettings::new(ProviderKind::Ollama).with_model("mistral");
        let provider = ProviderFactory::create(&settings).unwrap();
        assert!(provider.available_models().contains(&"mistral".to_string()));
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let mut settings = ProviderSettings::new(ProviderKind::OpenAi);
        settings.api_key_env = Some("PMP_AI_CORE_TEST_UNSET_KEY".to_string());

        let error = ProviderFactory::create(&settings).unwrap_err();
        assert!(matches!(error, LlmError::Configuration { .. }));
    }

    #[test]
    fn test_settings_deserialize() {
        let settings: ProviderSettings = serde_json::from_value(serde_json::json!({
            "name": "local",
            "type": "mock",
            "response": "ok",
            "rate_limit": {"requests": 5}
        }))
        .unwrap();

        assert_eq!(settings.kind, ProviderKind::Mock);
        assert_eq!(settings.provider_name(), "local");
        assert_eq!(settings.rate_limit.requests, 5);
        assert_eq!(settings.rate_limit.window_ms, 60_000);
    }
}
