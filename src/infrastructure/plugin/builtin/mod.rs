//! Built-in Plugins
//!
//! Analysis plugins that ship with the core.

mod keywords;
mod summary;

pub use keywords::{KEYWORDS_PLUGIN_ID, KeywordsConfig, KeywordsPlugin};
pub use summary::{RecordSummary, SUMMARY_PLUGIN_ID, SummaryPlugin};

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::plugin::{AnalysisPlugin, PluginError};
use crate::infrastructure::plugin::registry::PluginRegistry;
use crate::infrastructure::services::ModelGateway;

/// Register and activate the built-in plugins.
///
/// Every plugin is attempted; the errors of those that failed are returned together.
pub async fn register_builtin_plugins(
    registry: &PluginRegistry,
    gateway: Arc<ModelGateway>,
    keywords: KeywordsConfig,
) -> Result<(), Vec<PluginError>> {
    let plugins: Vec<Arc<dyn AnalysisPlugin>> = vec![
        Arc::new(KeywordsPlugin::new(keywords)),
        Arc::new(SummaryPlugin::new(gateway)),
    ];

    let mut errors = Vec::new();

    for plugin in plugins {
        let plugin_id = plugin.metadata().id.clone();
        debug!(plugin = %plugin_id, "Registering built-in plugin");

        let outcome = match registry.register(plugin).await {
            Ok(()) => registry.activate(&plugin_id).await,
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            errors.push(e);
        }
    }

    if errors.is_empty() {
        info!(count = registry.len().await, "Built-in plugins registered");
        Ok(())
    } else {
        Err(errors)
    }
}
