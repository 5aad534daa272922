//! Cache infrastructure - Cache implementations

mod embedding;
mod lru;

pub use embedding::{EmbeddingCache, EmbeddingCacheConfig};
pub use lru::{ResponseCache, ResponseCacheConfig};
