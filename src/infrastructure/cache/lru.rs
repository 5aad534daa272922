//! Bounded, time-expiring LRU cache for model responses

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::domain::cache::CacheStats;

/// Configuration for the response cache
#[derive(Debug, Clone, Copy)]
pub struct ResponseCacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// Time-to-live applied to every entry
    pub ttl: Duration,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl ResponseCacheConfig {
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_ttl_secs(mut self, secs: u64) -> Self {
        self.ttl = Duration::from_secs(secs);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    /// Position in the recency order; higher is more recent
    tick: u64,
}

#[derive(Debug)]
struct LruState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    recency: BTreeMap<u64, String>,
    next_tick: u64,
    hits: u64,
    misses: u64,
}

impl<V> LruState<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            next_tick: 0,
            hits: 0,
            misses: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.tick);
        Some(entry)
    }

    fn evict_least_recent(&mut self) -> Option<String> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

/// Thread-safe LRU cache with a fixed TTL.
///
/// - Expired entries are never returned and count as misses.
/// - Every hit moves the entry to the most-recently-used position.
/// - Inserting at capacity evicts the least-recently-used entry first.
/// - No background sweeper; call `prune` to drop expired entries.
#[derive(Debug)]
pub struct ResponseCache<V> {
    state: Mutex<LruState<V>>,
    config: ResponseCacheConfig,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new() -> Self {
        Self::with_config(ResponseCacheConfig::default())
    }

    pub fn with_config(config: ResponseCacheConfig) -> Self {
        Self {
            state: Mutex::new(LruState::new()),
            config,
        }
    }

    pub fn config(&self) -> &ResponseCacheConfig {
        &self.config
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut state = self.lock();

        let expired = match state.entries.get(key) {
            None => {
                state.misses += 1;
                return None;
            }
            Some(entry) => now > entry.expires_at,
        };

        if expired {
            state.remove(key);
            state.misses += 1;
            debug!(key = %key, "Cache entry expired");
            return None;
        }

        let tick = state.tick();
        let old_tick = match state.entries.get_mut(key) {
            Some(entry) => std::mem::replace(&mut entry.tick, tick),
            None => return None,
        };
        state.recency.remove(&old_tick);
        state.recency.insert(tick, key.to_string());
        state.hits += 1;

        state.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_at(key.into(), value, Instant::now());
    }

    fn set_at(&self, key: String, value: V, now: Instant) {
        if self.config.max_entries == 0 {
            return;
        }

        let mut state = self.lock();

        if state.remove(&key).is_none() && state.entries.len() >= self.config.max_entries {
            if let Some(evicted) = state.evict_least_recent() {
                debug!(key = %evicted, "Evicted least recently used cache entry");
            }
        }

        let tick = state.tick();
        state.recency.insert(tick, key.clone());
        state.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + self.config.ttl,
                tick,
            },
        );
    }

    pub fn delete(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Remove every entry. Hit/miss counters are kept.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.recency.clear();
    }

    /// Remove all expired entries, returning how many were dropped
    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    fn prune_at(&self, now: Instant) -> usize {
        let mut state = self.lock();

        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| now > entry.expires_at)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.remove(key);
        }

        if !expired.is_empty() {
            debug!(pruned = expired.len(), "Pruned expired cache entries");
        }

        expired.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats::new(state.entries.len(), state.hits, state.misses)
    }

    fn lock(&self) -> MutexGuard<'_, LruState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
