use std::sync::Arc;

use cg_clock::SharedClock;

use crate::config::LimiterConfig;
use crate::config::LimiterParams;
use crate::config::Strategy;
use crate::error::Result;
use crate::fixed_window::FixedWindow;
use crate::leaky_bucket::LeakyBucket;
use crate::limiter::RateLimiter;
use crate::sliding_window::SlidingWindow;
use crate::token_bucket::TokenBucket;
use crate::unlimited::Unlimited;

/// Builds limiters from a strategy tag and parameters
///
/// Callers get back `Arc<dyn RateLimiter>` and never name the concrete type.
pub struct RateLimiterFactory;

impl RateLimiterFactory {
    /// Build a limiter from a strategy tag such as `"sliding_window"`
    ///
    /// Unknown tags and invalid parameters are errors; nothing falls back to a
    /// default strategy.
    pub fn create(tag: &str, params: &LimiterParams, clock: SharedClock) -> Result<Arc<dyn RateLimiter>> {
        let strategy: Strategy = tag.parse()?;
        Self::build(strategy, params, clock)
    }

    /// Build a limiter for an already parsed strategy
    pub fn build(strategy: Strategy, params: &LimiterParams, clock: SharedClock) -> Result<Arc<dyn RateLimiter>> {
        let limiter: Arc<dyn RateLimiter> = match strategy {
            Strategy::TokenBucket => Arc::new(TokenBucket::with_clock(params.checked_rate()?, params.checked_capacity()?, clock)?),
            Strategy::FixedWindow => Arc::new(FixedWindow::with_clock(params.checked_limit()?, params.checked_window()?, clock)?),
            Strategy::SlidingWindow => Arc::new(SlidingWindow::with_clock(params.checked_limit()?, params.checked_window()?, clock)?),
            Strategy::LeakyBucket => Arc::new(LeakyBucket::with_clock(params.checked_capacity()?, params.checked_rate()?, clock)?),
        };
        Ok(limiter)
    }

    /// Build a limiter from its configuration entry
    ///
    /// A disabled entry is still validated, then replaced by [`Unlimited`].
    pub fn from_config(config: &LimiterConfig, clock: SharedClock) -> Result<Arc<dyn RateLimiter>> {
        let limiter = Self::build(config.strategy, &config.params, clock)?;
        if config.enabled {
            return Ok(limiter);
        }

        tracing::warn!(strategy = %config.strategy, "rate limiter disabled, granting all requests");
        Ok(Arc::new(Unlimited::new()))
    }
}
