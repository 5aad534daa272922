//! Cache domain - request fingerprints and cache statistics

mod key;
mod stats;

pub use key::{CacheKeyGenerator, CacheKeyParams, DefaultKeyGenerator};
pub use stats::CacheStats;
