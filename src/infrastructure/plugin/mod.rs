//! Plugin Infrastructure
//!
//! - Plugin registry holding lifecycle state
//! - Orchestrator fanning records out to active plugins
//! - Built-in analysis plugins

pub mod builtin;
pub mod orchestrator;
pub mod registry;

pub use builtin::{
    KeywordsConfig, KeywordsPlugin, SummaryPlugin, register_builtin_plugins,
};
pub use orchestrator::PluginOrchestrator;
pub use registry::PluginRegistry;
