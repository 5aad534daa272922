//! Embedding provider construction from settings

use std::sync::Arc;

use super::{HttpClient, MockEmbeddingProvider, OpenAiEmbeddingProvider};
use crate::domain::{EmbeddingProvider, LlmError};
use crate::infrastructure::llm::{ProviderKind, ProviderSettings};

#[derive(Debug)]
pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {
    /// Only `openai` and `mock` expose an embeddings endpoint
    pub fn create(settings: &ProviderSettings) -> Result<Arc<dyn EmbeddingProvider>, LlmError> {
        match settings.kind {
            ProviderKind::OpenAi => {
                let api_key = settings.resolve_api_key()?;
                let provider = match settings.base_url {
                    Some(ref url) => {
                        OpenAiEmbeddingProvider::with_base_url(HttpClient::new(), api_key, url)
                    }
                    None => OpenAiEmbeddingProvider::new(HttpClient::new(), api_key),
                };
                Ok(Arc::new(provider))
            }
            ProviderKind::Mock => Ok(Arc::new(MockEmbeddingProvider::new())),
            kind => Err(LlmError::configuration(format!(
                "Provider type {kind:?} does not support embeddings"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_embedding_providers() {
        let mock = EmbeddingProviderFactory::create(&ProviderSettings::new(ProviderKind::Mock));
        assert_eq!(mock.unwrap().provider_name(), "mock");

        let openai = EmbeddingProviderFactory::create(
            &ProviderSettings::new(ProviderKind::OpenAi).with_api_key("sk-test"),
        );
        assert_eq!(openai.unwrap().provider_name(), "openai");
    }

    #[test]
    fn test_unsupported_kind_is_configuration_error() {
        let error =
            EmbeddingProviderFactory::create(&ProviderSettings::new(ProviderKind::Anthropic))
                .unwrap_err();
        assert!(matches!(error, LlmError::Configuration { .. }));
    }
}
