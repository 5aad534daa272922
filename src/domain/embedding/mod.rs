//! Embedding domain - vector generation capability

mod provider;

pub use provider::{Embedding, EmbeddingProvider};
