//! Per-provider rate limiter
//!
//! Keeps one fixed-window token bucket per provider identity. Buckets are
//! created on first use.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use super::bucket::{RateLimitConfig, TokenBucket};

/// Snapshot of one provider's bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    pub provider: String,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Total limit for the window
    pub limit: u32,
    /// Time until the window resets
    pub reset_in_ms: u64,
}

/// Rate limiter keyed by provider name.
///
/// All bucket mutations happen under a single lock.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    configs: HashMap<String, RateLimitConfig>,
    default_config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a limiter applying `default_config` to every provider
    pub fn new(default_config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            configs: HashMap::new(),
            default_config,
        }
    }

    /// Override the limit for one provider
    pub fn with_provider_limit(mut self, provider: impl Into<String>, config: RateLimitConfig) -> Self {
        self.configs.insert(provider.into(), config);
        self
    }

    /// Whether the provider would be admitted right now (does not consume)
    pub fn try_admit(&self, provider: &str) -> bool {
        self.with_bucket(provider, |bucket, now| bucket.try_admit(now))
    }

    /// Record one request against the provider's bucket
    pub fn consume(&self, provider: &str) {
        self.with_bucket(provider, |bucket, now| bucket.consume(now));
    }

    pub fn remaining(&self, provider: &str) -> u32 {
        self.with_bucket(provider, |bucket, now| bucket.remaining(now))
    }

    pub fn reset_in_ms(&self, provider: &str) -> u64 {
        self.with_bucket(provider, |bucket, now| bucket.reset_in(now).as_millis() as u64)
    }

    pub fn status(&self, provider: &str) -> RateLimitStatus {
        self.with_bucket(provider, |bucket, now| RateLimitStatus {
            provider: provider.to_string(),
            remaining: bucket.remaining(now),
            limit: bucket.capacity(),
            reset_in_ms: bucket.reset_in(now).as_millis() as u64,
        })
    }

    /// Drop a provider's bucket so it starts fresh on next use
    pub fn reset(&self, provider: &str) {
        self.lock().remove(provider);
        debug!(provider = %provider, "Rate limit bucket reset");
    }

    fn config_for(&self, provider: &str) -> RateLimitConfig {
        self.configs
            .get(provider)
            .copied()
            .unwrap_or(self.default_config)
    }

    fn with_bucket<T>(&self, provider: &str, f: impl FnOnce(&mut TokenBucket, Instant) -> T) -> T {
        let now = Instant::now();
        let config = self.config_for(provider);
        let mut buckets = self.lock();
        let bucket = buckets
            .entry(provider.to_string())
            .or_insert_with(|| TokenBucket::new(config, now));

        f(bucket, now)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TokenBucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
