//! Infrastructure layer - providers, caches, admission control and plugins

pub mod cache;
pub mod embedding;
pub mod llm;
pub mod logging;
pub mod metrics;
pub mod plugin;
pub mod rate_limit;
pub mod services;
