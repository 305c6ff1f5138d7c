//! # cg_cache
//!
//! In-memory response cache for expensive generation and scoring calls.
//!
//! [`CacheManager`] stores values under keys built by [`generate_key`], expires
//! them after a TTL, evicts the least recently used entry when full, and
//! deduplicates concurrent computations of the same key through
//! [`CacheManager::get_or_compute`].
//!
//! The cache never consults a rate limiter. Check the cache first and only
//! spend a permit on a miss.

pub mod config;
pub mod error;
pub mod key;
pub mod manager;
pub mod stats;

pub use config::CacheConfig;
pub use error::CacheError;
pub use error::Result;
pub use key::CacheKeyBuilder;
pub use key::generate_key;
pub use manager::CacheManager;
pub use stats::CacheStats;
