use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::plugin::AnalyzeOptions;
use crate::infrastructure::cache::{EmbeddingCacheConfig, ResponseCacheConfig};
use crate::infrastructure::llm::{ProviderKind, ProviderSettings};
use crate::infrastructure::plugin::KeywordsConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub gateway: GatewayConfig,
    pub cache: CacheConfig,
    pub embedding: EmbeddingConfig,
    pub orchestrator: OrchestratorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Provider chain: the primary is tried first, then fallbacks in order
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub primary: ProviderSettings,
    pub fallbacks: Vec<ProviderSettings>,
    pub default_model: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub max_entries: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub enabled: bool,
    pub provider: ProviderSettings,
    pub model: Option<String>,
    pub ttl_secs: u64,
    pub max_entries: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub timeout_ms: u64,
    pub parallel: bool,
    pub continue_on_error: bool,
    pub keywords: KeywordsConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            primary: ProviderSettings::new(ProviderKind::Mock),
            fallbacks: Vec::new(),
            default_model: None,
            request_timeout_ms: None,
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
            max_entries: 1000,
        }
    }
}

impl CacheConfig {
    pub fn response_cache_config(&self) -> ResponseCacheConfig {
        ResponseCacheConfig::default()
            .with_max_entries(self.max_entries)
            .with_ttl_secs(self.ttl_secs)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: ProviderSettings::new(ProviderKind::Mock),
            model: None,
            ttl_secs: 24 * 3600,
            max_entries: 10_000,
        }
    }
}

impl EmbeddingConfig {
    pub fn cache_config(&self) -> EmbeddingCacheConfig {
        EmbeddingCacheConfig {
            max_capacity: self.max_entries,
            ttl: Duration::from_secs(self.ttl_secs),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        let defaults = AnalyzeOptions::default();

        Self {
            timeout_ms: defaults.timeout_ms,
            parallel: defaults.parallel,
            continue_on_error: defaults.continue_on_error,
            keywords: KeywordsConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn analyze_options(&self) -> AnalyzeOptions {
        AnalyzeOptions {
            plugins: None,
            parallel: self.parallel,
            timeout_ms: self.timeout_ms,
            continue_on_error: self.continue_on_error,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Layer `config/default`, `config/local`, an optional extra file and
    /// `APP__*` environment variables, later sources winning
    pub fn load_from(extra: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        if let Some(path) = extra {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_json(json: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(json, config::FileFormat::Json))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_run_offline() {
        let config = AppConfig::default();

        assert_eq!(config.gateway.primary.kind, ProviderKind::Mock);
        assert!(config.gateway.fallbacks.is_empty());
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert!(!config.embedding.enabled);
        assert_eq!(config.orchestrator.timeout_ms, 30_000);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = from_json(
            r#"{
                "logging": {"format": "json"},
                "gateway": {
                    "primary": {"type": "openai", "api_key_env": "OPENAI_API_KEY",
                                "rate_limit": {"requests": 10, "window_ms": 1000}},
                    "fallbacks": [{"type": "ollama", "model": "llama3.1"}],
                    "request_timeout_ms": 15000
                },
                "cache": {"max_entries": 50},
                "orchestrator": {"parallel": false, "keywords": {"watch_words": ["invoice"]}}
            }"#,
        );

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.gateway.primary.kind, ProviderKind::OpenAi);
        assert_eq!(config.gateway.primary.rate_limit.requests, 10);
        assert_eq!(config.gateway.fallbacks[0].kind, ProviderKind::Ollama);
        assert_eq!(config.gateway.request_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.cache.max_entries, 50);
        assert_eq!(config.cache.ttl_secs, 3600);

        let options = config.orchestrator.analyze_options();
        assert!(!options.parallel);
        assert!(options.continue_on_error);
        assert_eq!(config.orchestrator.keywords.watch_words, vec!["invoice"]);
        assert_eq!(config.orchestrator.keywords.max_keywords, 5);
    }
}
