//! # cg_ratelimit
//!
//! Rate limiters for outbound calls to quota-constrained services.
//!
//! Four interchangeable strategies share the [`RateLimiter`] trait:
//!
//! | Strategy | Type | Behaviour |
//! |----------|------|-----------|
//! | `token_bucket` | [`TokenBucket`] | continuous refill, bursts up to capacity |
//! | `fixed_window` | [`FixedWindow`] | quota resets at aligned window boundaries |
//! | `sliding_window` | [`SlidingWindow`] | quota over a trailing window, no boundary burst |
//! | `leaky_bucket` | [`LeakyBucket`] | bounded queued weight draining at a constant rate |
//!
//! [`RateLimiterFactory`] builds any of them from a tag, and [`MultiRateLimiter`]
//! routes calls to named, independently configured limiters.
//!
//! ```
//! use cg_ratelimit::LimiterParams;
//! use cg_ratelimit::MultiRateLimiter;
//!
//! let limiters = MultiRateLimiter::new();
//! limiters.add_limiter("image_api", "leaky_bucket", &LimiterParams::new(2.0).with_capacity(4.0)).unwrap();
//!
//! if limiters.acquire("image_api", 1).unwrap() {
//!     // issue the request
//! }
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod fixed_window;
pub mod leaky_bucket;
pub mod limiter;
pub mod multi_limiter;
pub mod sliding_window;
pub mod token_bucket;
pub mod unlimited;

pub use cg_clock::SharedClock;
pub use config::LimiterConfig;
pub use config::LimiterParams;
pub use config::Strategy;
pub use error::RateLimitError;
pub use error::Result;
pub use factory::RateLimiterFactory;
pub use fixed_window::FixedWindow;
pub use fixed_window::FixedWindowBuilder;
pub use leaky_bucket::LeakyBucket;
pub use leaky_bucket::LeakyBucketBuilder;
pub use limiter::LimiterSnapshot;
pub use limiter::POLL_INTERVAL;
pub use limiter::RateLimiter;
pub use multi_limiter::MultiRateLimiter;
pub use multi_limiter::MultiRateLimiterBuilder;
pub use sliding_window::SlidingWindow;
pub use sliding_window::SlidingWindowBuilder;
pub use token_bucket::TokenBucket;
pub use token_bucket::TokenBucketBuilder;
pub use unlimited::Unlimited;

/// Slack for floating point token arithmetic
pub(crate) const EPSILON: f64 = 1e-9;
