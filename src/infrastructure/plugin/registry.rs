//! Plugin Registry
//!
//! Holds analysis plugins in registration order together with their
//! lifecycle state. Lifecycle hooks run under the write lock, so a state
//! flip is only ever observed after its hook resolved.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::domain::plugin::{
    AnalysisPlugin, LifecyclePhase, PluginError, PluginInfo, PluginState,
};
use crate::infrastructure::metrics;

/// Entry in the plugin registry
#[derive(Debug)]
struct PluginEntry {
    plugin: Arc<dyn AnalysisPlugin>,
    state: PluginState,
}

impl PluginEntry {
    fn id(&self) -> &str {
        &self.plugin.metadata().id
    }
}

/// Registry of analysis plugins
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: RwLock<Vec<PluginEntry>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin. It starts out inactive.
    pub async fn register(&self, plugin: Arc<dyn AnalysisPlugin>) -> Result<(), PluginError> {
        let metadata = plugin.metadata();
        let mut plugins = self.plugins.write().await;

        if plugins.iter().any(|entry| entry.id() == metadata.id) {
            return Err(PluginError::already_registered(&metadata.id));
        }

        info!(
            plugin_id = %metadata.id,
            plugin_name = %metadata.name,
            plugin_version = %metadata.version,
            "Registering plugin"
        );

        plugins.push(PluginEntry {
            plugin: plugin.clone(),
            state: PluginState::Registered,
        });

        Ok(())
    }

    /// Run the plugin's initializer and mark it active on success.
    ///
    /// Activating an already active plugin is a no-op.
    pub async fn activate(&self, plugin_id: &str) -> Result<(), PluginError> {
        let mut plugins = self.plugins.write().await;
        let entry = find_mut(&mut plugins, plugin_id)?;

        if entry.state.is_active() {
            debug!(plugin_id = %plugin_id, "Plugin already active");
            return Ok(());
        }

        if let Err(e) = entry.plugin.initialize().await {
            error!(plugin_id = %plugin_id, error = %e, "Plugin initialization failed");
            return Err(lifecycle_error(plugin_id, LifecyclePhase::Initialize, e));
        }

        entry.state = PluginState::Active;
        info!(plugin_id = %plugin_id, "Plugin activated");
        metrics::record_active_plugins(count_active(&plugins));

        Ok(())
    }

    /// Run the plugin's destructor and mark it inactive on success.
    ///
    /// Deactivating an inactive plugin is a no-op.
    pub async fn deactivate(&self, plugin_id: &str) -> Result<(), PluginError> {
        let mut plugins = self.plugins.write().await;
        let entry = find_mut(&mut plugins, plugin_id)?;

        if !entry.state.is_active() {
            debug!(plugin_id = %plugin_id, "Plugin already inactive");
            return Ok(());
        }

        destroy(entry).await?;

        entry.state = PluginState::Registered;
        info!(plugin_id = %plugin_id, "Plugin deactivated");
        metrics::record_active_plugins(count_active(&plugins));

        Ok(())
    }

    /// Remove a plugin, deactivating it first when active.
    ///
    /// A failing destructor leaves the plugin registered and active.
    pub async fn unregister(&self, plugin_id: &str) -> Result<Arc<dyn AnalysisPlugin>, PluginError> {
        let mut plugins = self.plugins.write().await;
        let position = plugins
            .iter()
            .position(|entry| entry.id() == plugin_id)
            .ok_or_else(|| PluginError::not_found(plugin_id))?;

        if plugins[position].state.is_active() {
            destroy(&plugins[position]).await?;
        }

        let entry = plugins.remove(position);
        info!(plugin_id = %plugin_id, "Plugin unregistered");
        metrics::record_active_plugins(count_active(&plugins));

        Ok(entry.plugin)
    }

    pub async fn get(&self, plugin_id: &str) -> Option<Arc<dyn AnalysisPlugin>> {
        self.plugins
            .read()
            .await
            .iter()
            .find(|entry| entry.id() == plugin_id)
            .map(|entry| entry.plugin.clone())
    }

    pub async fn state(&self, plugin_id: &str) -> Option<PluginState> {
        self.plugins
            .read()
            .await
            .iter()
            .find(|entry| entry.id() == plugin_id)
            .map(|entry| entry.state)
    }

    pub async fn is_registered(&self, plugin_id: &str) -> bool {
        self.state(plugin_id).await.is_some()
    }

    pub async fn is_active(&self, plugin_id: &str) -> bool {
        self.state(plugin_id).await.is_some_and(|state| state.is_active())
    }

    /// All plugins in registration order
    pub async fn list_plugins(&self) -> Vec<PluginInfo> {
        self.plugins
            .read()
            .await
            .iter()
            .map(|entry| PluginInfo {
                metadata: entry.plugin.metadata().clone(),
                state: entry.state,
                supports_insights: entry.plugin.insight_generator().is_some(),
            })
            .collect()
    }

    pub async fn active_plugin_ids(&self) -> Vec<String> {
        self.plugins
            .read()
            .await
            .iter()
            .filter(|entry| entry.state.is_active())
            .map(|entry| entry.id().to_string())
            .collect()
    }

    /// Snapshot of the active plugins in registration order
    pub async fn active_plugins(&self) -> Vec<Arc<dyn AnalysisPlugin>> {
        self.plugins
            .read()
            .await
            .iter()
            .filter(|entry| entry.state.is_active())
            .map(|entry| entry.plugin.clone())
            .collect()
    }

    /// Snapshot of the plugins an analysis should fan out to.
    ///
    /// With an explicit selection, ids are intersected with the registered
    /// set (inactive plugins included, unknown ids dropped). Without one,
    /// every active plugin is used. Registration order is kept either way.
    pub async fn resolve(&self, selection: Option<&[String]>) -> Vec<Arc<dyn AnalysisPlugin>> {
        let Some(selection) = selection else {
            return self.active_plugins().await;
        };

        let plugins = self.plugins.read().await;

        for id in selection {
            if !plugins.iter().any(|entry| entry.id() == id) {
                debug!(plugin_id = %id, "Requested plugin is not registered, skipping");
            }
        }

        plugins
            .iter()
            .filter(|entry| selection.iter().any(|id| id == entry.id()))
            .map(|entry| entry.plugin.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.plugins.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.plugins.read().await.is_empty()
    }
}

fn find_mut<'a>(
    plugins: &'a mut [PluginEntry],
    plugin_id: &str,
) -> Result<&'a mut PluginEntry, PluginError> {
    plugins
        .iter_mut()
        .find(|entry| entry.id() == plugin_id)
        .ok_or_else(|| PluginError::not_found(plugin_id))
}

async fn destroy(entry: &PluginEntry) -> Result<(), PluginError> {
    entry.plugin.destroy().await.map_err(|e| {
        error!(plugin_id = %entry.id(), error = %e, "Plugin destroy failed");
        lifecycle_error(entry.id(), LifecyclePhase::Destroy, e)
    })
}

fn count_active(plugins: &[PluginEntry]) -> usize {
    plugins.iter().filter(|entry| entry.state.is_active()).count()
}

fn lifecycle_error(plugin_id: &str, phase: LifecyclePhase, error: PluginError) -> PluginError {
    match error {
        lifecycle @ PluginError::Lifecycle { .. } => lifecycle,
        other => PluginError::lifecycle(plugin_id, phase, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plugin::{DomainRecord, PluginAnalysis, PluginMetadata};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct MockPlugin {
        metadata: PluginMetadata,
        fail_initialize: bool,
        fail_destroy: bool,
        initialized: AtomicUsize,
        destroyed: AtomicUsize,
    }

    impl MockPlugin {
        fn new(id: &str) -> Self {
            Self {
                metadata: PluginMetadata::new(id, format!("Mock Plugin {}", id), "1.0.0"),
                fail_initialize: false,
                fail_destroy: false,
                initialized: AtomicUsize::new(0),
                destroyed: AtomicUsize::new(0),
            }
        }

        fn failing_initialize(mut self) -> Self {
            self.fail_initialize = true;
            self
        }

        fn failing_destroy(mut self) -> Self {
            self.fail_destroy = true;
            self
        }
    }

    #[async_trait::async_trait]
    impl AnalysisPlugin for MockPlugin {
        fn metadata(&self) -> &PluginMetadata {
            &self.metadata
        }

        async fn initialize(&self) -> Result<(), PluginError> {
            self.initialized.fetch_add(1, Ordering::SeqCst);
            if self.fail_initialize {
                return Err(PluginError::analysis(&self.metadata.id, "model not loaded"));
            }
            Ok(())
        }

        async fn analyze(&self, _record: &DomainRecord) -> Result<PluginAnalysis, PluginError> {
            Ok(PluginAnalysis::new())
        }

        async fn destroy(&self) -> Result<(), PluginError> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            if self.fail_destroy {
                return Err(PluginError::analysis(&self.metadata.id, "handle leaked"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_register_plugin() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(MockPlugin::new("test-plugin"))).await.unwrap();

        let plugins = registry.list_plugins().await;
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].metadata.id, "test-plugin");
        assert_eq!(plugins[0].state, PluginState::Registered);
        assert!(!plugins[0].supports_insights);
        assert!(registry.is_registered("test-plugin").await);
        assert!(!registry.is_active("test-plugin").await);
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(MockPlugin::new("test-plugin"))).await.unwrap();

        let result = registry.register(Arc::new(MockPlugin::new("test-plugin"))).await;

        assert!(matches!(result, Err(PluginError::AlreadyRegistered { .. })));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_activate_and_deactivate() {
        let registry = PluginRegistry::new();
        let plugin = Arc::new(MockPlugin::new("p"));
        registry.register(plugin.clone()).await.unwrap();

        registry.activate("p").await.unwrap();
        registry.activate("p").await.unwrap();
        assert!(registry.is_active("p").await);
        assert_eq!(plugin.initialized.load(Ordering::SeqCst), 1);

        registry.deactivate("p").await.unwrap();
        assert!(!registry.is_active("p").await);
        assert!(registry.is_registered("p").await);
        assert_eq!(plugin.destroyed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_activate_unknown_plugin() {
        let registry = PluginRegistry::new();
        let result = registry.activate("ghost").await;
        assert!(matches!(result, Err(PluginError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_failed_initialize_keeps_plugin_inactive() {
        let registry = PluginRegistry::new();
        registry
            .register(Arc::new(MockPlugin::new("p").failing_initialize()))
            .await
            .unwrap();

        let error = registry.activate("p").await.unwrap_err();

        assert!(matches!(
            error,
            PluginError::Lifecycle {
                phase: LifecyclePhase::Initialize,
                ..
            }
        ));
        assert_eq!(registry.state("p").await, Some(PluginState::Registered));
    }

    #[tokio::test]
    async fn test_failed_destroy_keeps_plugin_active() {
        let registry = PluginRegistry::new();
        registry
            .register(Arc::new(MockPlugin::new("p").failing_destroy()))
            .await
            .unwrap();
        registry.activate("p").await.unwrap();

        let error = registry.deactivate("p").await.unwrap_err();
        assert!(matches!(
            error,
            PluginError::Lifecycle {
                phase: LifecyclePhase::Destroy,
                ..
            }
        ));
        assert!(registry.is_active("p").await);

        assert!(registry.unregister("p").await.is_err());
        assert!(registry.is_active("p").await);
    }

    #[tokio::test]
    async fn test_unregister_active_plugin_destroys_it() {
        let registry = PluginRegistry::new();
        let plugin = Arc::new(MockPlugin::new("p"));
        registry.register(plugin.clone()).await.unwrap();
        registry.activate("p").await.unwrap();

        registry.unregister("p").await.unwrap();

        assert!(!registry.is_registered("p").await);
        assert_eq!(plugin.destroyed.load(Ordering::SeqCst), 1);
        assert!(matches!(
            registry.unregister("p").await,
            Err(PluginError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_keeps_registration_order() {
        let registry = PluginRegistry::new();
        for id in ["a", "b", "c"] {
            registry.register(Arc::new(MockPlugin::new(id))).await.unwrap();
        }
        registry.activate("c").await.unwrap();
        registry.activate("a").await.unwrap();

        let ids = |plugins: Vec<Arc<dyn AnalysisPlugin>>| -> Vec<String> {
            plugins.iter().map(|p| p.metadata().id.clone()).collect()
        };

        assert_eq!(ids(registry.resolve(None).await), vec!["a", "c"]);
        assert_eq!(registry.active_plugin_ids().await, vec!["a", "c"]);

        let selection = vec!["c".to_string(), "ghost".to_string(), "b".to_string()];
        assert_eq!(ids(registry.resolve(Some(&selection)).await), vec!["b", "c"]);
    }
}
