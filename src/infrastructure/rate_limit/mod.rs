//! Provider admission control

mod bucket;
mod limiter;

pub use bucket::{RateLimitConfig, TokenBucket};
pub use limiter::{RateLimitStatus, RateLimiter};
