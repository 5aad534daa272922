//! Plugin entity types and capability traits
//!
//! Defines the `AnalysisPlugin` trait and associated metadata structures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;

use super::error::PluginError;
use super::insight::Insight;
use super::record::DomainRecord;

/// Plugin metadata containing identification information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Unique identifier for the plugin
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Plugin version (semver format)
    pub version: String,

    /// Plugin description
    pub description: String,

    /// Author or maintainer
    pub author: Option<String>,
}

impl PluginMetadata {
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            description: String::new(),
            author: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Registry state of a known plugin. Unregistered plugins have no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    /// Known to the registry but not eligible for fan-out
    Registered,

    /// Initialized and eligible for fan-out
    Active,
}

impl PluginState {
    pub fn is_active(&self) -> bool {
        matches!(self, PluginState::Active)
    }
}

/// What a plugin contributes for a single record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginAnalysis {
    /// Enrichment namespace merged into the enriched record
    pub enrichment: Map<String, Value>,

    /// Insights discovered while analyzing this record
    #[serde(default)]
    pub insights: Vec<Insight>,
}

impl PluginAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.enrichment.insert(key.into(), value.into());
        self
    }

    pub fn with_insight(mut self, insight: Insight) -> Self {
        self.insights.push(insight);
        self
    }
}

/// Optional capability: derive insights across a batch of records
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate_insights(
        &self,
        records: &[DomainRecord],
    ) -> Result<Vec<Insight>, PluginError>;
}

/// Core trait that every enrichment plugin implements.
///
/// `initialize` and `destroy` default to no-ops. Insight generation is probed
/// through `insight_generator`.
#[async_trait]
pub trait AnalysisPlugin: Send + Sync + Debug {
    /// Get plugin metadata
    fn metadata(&self) -> &PluginMetadata;

    /// Called on activation; the plugin only becomes active if this succeeds
    async fn initialize(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Analyze a single record
    async fn analyze(&self, record: &DomainRecord) -> Result<PluginAnalysis, PluginError>;

    /// Insight generation capability, if the plugin has one
    fn insight_generator(&self) -> Option<&dyn InsightGenerator> {
        None
    }

    /// Called on deactivation
    async fn destroy(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Registry view of a plugin
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    #[serde(flatten)]
    pub metadata: PluginMetadata,
    pub state: PluginState,
    pub supports_insights: bool,
}
