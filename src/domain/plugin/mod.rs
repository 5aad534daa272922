//! Plugin domain module
//!
//! Types and capability traits for enrichment plugins: the records they
//! analyze, what they return, the insights they produce and how a fan-out
//! over many plugins is reported back to the caller.

mod analysis;
mod entity;
mod error;
mod insight;
mod record;

pub use analysis::{AnalysisOutcome, AnalysisResult, AnalyzeOptions, DEFAULT_ANALYSIS_TIMEOUT_MS};
pub use entity::{
    AnalysisPlugin, InsightGenerator, PluginAnalysis, PluginInfo, PluginMetadata, PluginState,
};
pub use error::{LifecyclePhase, PluginError};
pub use insight::{Insight, InsightPriority};
pub use record::{DomainRecord, EnrichedRecord};
