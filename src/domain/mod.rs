//! Domain layer - core types and capability traits

pub mod cache;
pub mod embedding;
pub mod llm;
pub mod plugin;

pub use cache::{CacheKeyGenerator, CacheKeyParams, CacheStats, DefaultKeyGenerator};
pub use embedding::{Embedding, EmbeddingProvider};
pub use llm::{
    InvocationOptions, InvocationResult, LlmError, Message, MessageRole, ModelProvider,
    ProviderFailure, TokenUsage,
};
pub use plugin::{
    AnalysisOutcome, AnalysisPlugin, AnalysisResult, AnalyzeOptions, DomainRecord,
    EnrichedRecord, Insight, InsightGenerator, InsightPriority, PluginAnalysis, PluginError,
    PluginInfo, PluginMetadata, PluginState,
};
