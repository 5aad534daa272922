//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::llm::LlmError;

/// A single embedding vector
pub type Embedding = Vec<f32>;

/// Trait for embedding providers (OpenAI, local runtimes, test doubles)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate one embedding per input, in input order
    async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Embedding>, LlmError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Get the default model for this provider
    fn default_model(&self) -> &str;

    /// Get the embedding dimensions for a model
    fn dimensions(&self, model: &str) -> Option<usize>;
}
