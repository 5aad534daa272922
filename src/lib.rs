//! PMP AI Core
//!
//! Orchestration core for personal-assistant style applications:
//! - Model gateway with per-provider rate limiting, a response cache and
//!   ordered provider fallback
//! - Embedding generation with a vector cache
//! - Plugin orchestrator fanning domain records out to analysis plugins
//!   with per-plugin timeouts and error isolation

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use domain::LlmError;
use infrastructure::cache::EmbeddingCache;
use infrastructure::embedding::EmbeddingProviderFactory;
use infrastructure::llm::ProviderFactory;
use infrastructure::plugin::{PluginOrchestrator, PluginRegistry, register_builtin_plugins};
use infrastructure::rate_limit::RateLimiter;
use infrastructure::services::ModelGateway;

/// Build the model gateway described by the configuration
pub fn build_gateway(config: &AppConfig) -> Result<ModelGateway, LlmError> {
    let gateway_config = &config.gateway;

    let primary = ProviderFactory::create(&gateway_config.primary)?;
    let mut rate_limiter = RateLimiter::default()
        .with_provider_limit(primary.provider_name(), gateway_config.primary.rate_limit);
    let mut builder = ModelGateway::builder(primary);

    for settings in &gateway_config.fallbacks {
        let fallback = ProviderFactory::create(settings)?;
        rate_limiter = rate_limiter.with_provider_limit(fallback.provider_name(), settings.rate_limit);
        builder = builder.with_fallback(fallback);
    }

    builder = builder.with_rate_limiter(rate_limiter);

    builder = if config.cache.enabled {
        builder.with_cache(config.cache.response_cache_config())
    } else {
        builder.without_cache()
    };

    if let Some(ref model) = gateway_config.default_model {
        builder = builder.with_default_model(model);
    }

    if let Some(timeout) = gateway_config.request_timeout() {
        builder = builder.with_request_timeout(timeout);
    }

    if config.embedding.enabled {
        let provider = EmbeddingProviderFactory::create(&config.embedding.provider)?;
        let cache = EmbeddingCache::with_config(config.embedding.cache_config());
        builder = builder.with_embeddings(provider, cache);

        if let Some(ref model) = config.embedding.model {
            builder = builder.with_embedding_model(model);
        }
    }

    let gateway = builder.build();
    info!(providers = ?gateway.provider_names(), "Model gateway ready");

    Ok(gateway)
}

/// Build an orchestrator with the built-in plugins registered and active
pub async fn build_orchestrator(
    config: &AppConfig,
    gateway: Arc<ModelGateway>,
) -> anyhow::Result<PluginOrchestrator> {
    let registry = Arc::new(PluginRegistry::default());

    register_builtin_plugins(&registry, gateway, config.orchestrator.keywords.clone())
        .await
        .map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            anyhow::anyhow!("Failed to register plugins: {}", messages.join("; "))
        })?;

    Ok(PluginOrchestrator::new(registry).with_defaults(config.orchestrator.analyze_options()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainRecord, InvocationOptions};
    use crate::infrastructure::llm::{ProviderKind, ProviderSettings};

    #[tokio::test]
    async fn test_default_config_builds_offline_gateway() {
        let gateway = build_gateway(&AppConfig::default()).unwrap();

        let content = gateway
            .complete_prompt("", "hello there", &InvocationOptions::default())
            .await
            .unwrap();

        assert_eq!(content, "[mock] hello there");
        assert!(gateway.cache_stats().is_some());
    }

    #[tokio::test]
    async fn test_fallbacks_and_embeddings_are_wired() {
        let mut config = AppConfig::default();
        config.gateway.fallbacks.push({
            let mut settings = ProviderSettings::new(ProviderKind::Mock);
            settings.name = Some("backup".to_string());
            settings
        });
        config.cache.enabled = false;
        config.embedding.enabled = true;

        let gateway = build_gateway(&config).unwrap();

        assert_eq!(gateway.provider_names(), vec!["mock", "backup"]);
        assert!(gateway.cache_stats().is_none());

        let vector = gateway.embed("hello", None).await.unwrap();
        assert_eq!(vector.len(), 16);
    }

    #[test]
    fn test_unsupported_embedding_provider_is_rejected() {
        let mut config = AppConfig::default();
        config.embedding.enabled = true;
        config.embedding.provider = ProviderSettings::new(ProviderKind::Ollama);

        let error = build_gateway(&config).unwrap_err();
        assert!(matches!(error, LlmError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_orchestrator_runs_builtin_plugins() {
        let mut config = AppConfig::default();
        config.gateway.primary.response = Some(
            r#"{"summary": "Invoice is due", "category": "finance", "priority": "high"}"#
                .to_string(),
        );

        let gateway = Arc::new(build_gateway(&config).unwrap());
        let orchestrator = build_orchestrator(&config, gateway).await.unwrap();

        let record = DomainRecord::new("email-1", "email")
            .with_field("subject", "Invoice overdue")
            .with_field("body", "The invoice deadline passed, please pay the invoice");

        let result = orchestrator.analyze_with_defaults(&record).await.unwrap();

        assert_eq!(result.succeeded(), vec!["keywords", "summary"]);
        assert!(result.enriched.get("keywords").is_some());
        assert!(result.enriched.get("summary").is_some());
        assert!(!result.insights.is_empty());
    }
}
