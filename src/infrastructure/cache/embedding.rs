//! Embedding cache using moka
//!
//! Memoizes vectors by `(model, text)` fingerprint so repeated texts never
//! reach the embedding provider twice within the TTL.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::domain::cache::{CacheKeyGenerator, CacheKeyParams, CacheStats, DefaultKeyGenerator};
use crate::domain::embedding::Embedding;

/// Configuration for the embedding cache
#[derive(Debug, Clone)]
pub struct EmbeddingCacheConfig {
    /// Maximum number of vectors kept
    pub max_capacity: u64,
    /// Time-to-live for every vector
    pub ttl: Duration,
}

impl Default for EmbeddingCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Duration::from_secs(24 * 3600),
        }
    }
}

/// Vector cache keyed by model and text
#[derive(Debug)]
pub struct EmbeddingCache {
    cache: MokaCache<String, Arc<Embedding>>,
    key_generator: DefaultKeyGenerator,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::with_config(EmbeddingCacheConfig::default())
    }

    pub fn with_config(config: EmbeddingCacheConfig) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .build();

        Self {
            cache,
            key_generator: DefaultKeyGenerator::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn key(&self, model: &str, text: &str) -> String {
        self.key_generator
            .generate_with_namespace("embedding", &CacheKeyParams::for_embedding(model, text))
    }

    pub async fn get(&self, model: &str, text: &str) -> Option<Arc<Embedding>> {
        let found = self.cache.get(&self.key(model, text)).await;

        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);

        found
    }

    pub async fn set(&self, model: &str, text: &str, embedding: Embedding) {
        self.cache
            .insert(self.key(model, text), Arc::new(embedding))
            .await;
    }

    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks().await;
        CacheStats::new(
            self.cache.entry_count() as usize,
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = EmbeddingCache::new();
        cache.set("text-embedding-3-small", "hello", vec![0.1, 0.2]).await;

        let found = cache.get("text-embedding-3-small", "hello").await;
        assert_eq!(found.as_deref(), Some(&vec![0.1, 0.2]));
    }

    #[tokio::test]
    async fn test_model_is_part_of_key() {
        let cache = EmbeddingCache::new();
        cache.set("model-a", "hello", vec![1.0]).await;

        assert!(cache.get("model-b", "hello").await.is_none());
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let cache = EmbeddingCache::new();
        cache.set("m", "a", vec![1.0]).await;

        cache.get("m", "a").await;
        cache.get("m", "b").await;

        let stats = cache.stats().await;
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = EmbeddingCache::new();
        cache.set("m", "a", vec![1.0]).await;
        cache.clear().await;

        assert!(cache.get("m", "a").await.is_none());
    }
}
