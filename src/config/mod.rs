//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, CacheConfig, EmbeddingConfig, GatewayConfig, LogFormat, LoggingConfig,
    OrchestratorConfig,
};
