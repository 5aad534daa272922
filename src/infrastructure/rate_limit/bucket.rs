//! Fixed-window token bucket

use std::time::{Duration, Instant};

use serde::Deserialize;

/// Requests admitted per fixed window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
    /// Bucket capacity (requests per window)
    #[serde(default = "default_requests")]
    pub requests: u32,
    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

fn default_requests() -> u32 {
    60
}

fn default_window_ms() -> u64 {
    60_000
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: default_requests(),
            window_ms: default_window_ms(),
        }
    }
}

impl RateLimitConfig {
    pub fn new(requests: u32, window: Duration) -> Self {
        Self {
            requests,
            window_ms: window.as_millis() as u64,
        }
    }

    pub fn per_minute(requests: u32) -> Self {
        Self::new(requests, Duration::from_secs(60))
    }

    pub fn unlimited() -> Self {
        Self {
            requests: u32::MAX,
            window_ms: default_window_ms(),
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Token bucket refilled in one step at the end of each window.
///
/// Invariant: `0 <= tokens_remaining <= capacity`.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    tokens_remaining: u32,
    last_refill_at: Instant,
    refill_interval: Duration,
}

impl TokenBucket {
    pub fn new(config: RateLimitConfig, now: Instant) -> Self {
        Self {
            capacity: config.requests,
            tokens_remaining: config.requests,
            last_refill_at: now,
            refill_interval: config.window(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Reset to full capacity once a whole window has elapsed
    fn refill(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_refill_at) >= self.refill_interval {
            self.tokens_remaining = self.capacity;
            self.last_refill_at = now;
        }
    }

    /// Whether a request would be admitted. Only the window refill mutates.
    pub fn try_admit(&mut self, now: Instant) -> bool {
        self.refill(now);
        self.tokens_remaining > 0
    }

    /// Take one token; a no-op when the bucket is empty
    pub fn consume(&mut self, now: Instant) {
        self.refill(now);
        self.tokens_remaining = self.tokens_remaining.saturating_sub(1);
    }

    pub fn remaining(&mut self, now: Instant) -> u32 {
        self.refill(now);
        self.tokens_remaining
    }

    /// Time until the next refill
    pub fn reset_in(&mut self, now: Instant) -> Duration {
        self.refill(now);
        let elapsed = now.saturating_duration_since(self.last_refill_at);
        self.refill_interval.saturating_sub(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(requests: u32, window_ms: u64) -> (TokenBucket, Instant) {
        let now = Instant::now();
        let config = RateLimitConfig::new(requests, Duration::from_millis(window_ms));
        (TokenBucket::new(config, now), now)
    }

    #[test]
    fn test_admits_capacity_then_denies() {
        let (mut bucket, now) = bucket(3, 1000);

        for _ in 0..3 {
            assert!(bucket.try_admit(now));
            bucket.consume(now);
        }

        assert!(!bucket.try_admit(now));
        assert_eq!(bucket.remaining(now), 0);
    }

    #[test]
    fn test_try_admit_does_not_consume() {
        let (mut bucket, now) = bucket(1, 1000);

        assert!(bucket.try_admit(now));
        assert!(bucket.try_admit(now));
        assert_eq!(bucket.remaining(now), 1);
    }

    #[test]
    fn test_consume_never_goes_negative() {
        let (mut bucket, now) = bucket(1, 1000);

        bucket.consume(now);
        bucket.consume(now);
        bucket.consume(now);

        assert_eq!(bucket.remaining(now), 0);
    }

    #[test]
    fn test_refills_after_window() {
        let (mut bucket, now) = bucket(2, 100);

        bucket.consume(now);
        bucket.consume(now);
        assert!(!bucket.try_admit(now + Duration::from_millis(99)));

        let later = now + Duration::from_millis(100);
        assert!(bucket.try_admit(later));
        assert_eq!(bucket.remaining(later), 2);
    }

    #[test]
    fn test_reset_in_counts_down() {
        let (mut bucket, now) = bucket(1, 1000);

        assert_eq!(bucket.reset_in(now), Duration::from_millis(1000));
        assert_eq!(
            bucket.reset_in(now + Duration::from_millis(400)),
            Duration::from_millis(600)
        );
    }

    #[test]
    fn test_refill_is_a_single_step_not_a_leak() {
        let (mut bucket, now) = bucket(4, 100);

        bucket.consume(now);
        bucket.consume(now);

        // Half a window later nothing has trickled back
        assert_eq!(bucket.remaining(now + Duration::from_millis(50)), 2);
    }
}
