//! Embedding provider implementations

mod factory;
mod mock;
mod openai;

pub use factory::EmbeddingProviderFactory;
pub use mock::MockEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;

pub use super::llm::{HttpClient, HttpClientTrait};
