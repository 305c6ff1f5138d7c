use std::future::Future;
use std::time::Duration;

use cg_cache::CacheError;
use cg_cache::CacheManager;
use cg_clock::SharedClock;
use cg_clock::system_clock;
use cg_ratelimit::MultiRateLimiter;
use cg_ratelimit::RateLimitError;
use thiserror::Error;

use crate::config_loader::ThrottleConfigFile;

#[derive(Error, Debug)]
pub enum ThrottleError {
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("No permit from limiter '{limiter}' within {timeout:?}")]
    Throttled { limiter: String, timeout: Duration },

    #[error("Upstream call failed: {0}")]
    Upstream(String),
}

pub type Result<T> = std::result::Result<T, ThrottleError>;

/// One limiter registry and one response cache shared by a service
///
/// Construct it once at startup and hand out references; there is no
/// process-wide instance.
pub struct Throttle {
    limiters: MultiRateLimiter,
    cache: CacheManager<String>,
}

impl Throttle {
    pub fn from_config(config: &ThrottleConfigFile) -> Result<Self> {
        Self::with_clock(config, system_clock())
    }

    /// Build both halves on the same clock
    pub fn with_clock(config: &ThrottleConfigFile, clock: SharedClock) -> Result<Self> {
        let limiters = MultiRateLimiter::from_configs(&config.limiters, clock.clone())?;
        let cache = CacheManager::with_clock(config.cache.clone(), clock)?;

        tracing::info!(limiters = limiters.len(), cache_enabled = cache.is_enabled(), "throttle ready");

        Ok(Self { limiters, cache })
    }

    pub fn limiters(&self) -> &MultiRateLimiter {
        &self.limiters
    }

    pub fn cache(&self) -> &CacheManager<String> {
        &self.cache
    }

    /// Serve `key` from the cache, or call upstream under `limiter`
    ///
    /// Only the caller that actually runs `producer` spends a permit;
    /// concurrent callers for the same key share its result. Waiting longer
    /// than `timeout` for a permit fails with [`ThrottleError::Throttled`].
    pub async fn call<F, Fut>(&self, limiter: &str, key: &str, weight: u32, timeout: Duration, producer: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        self.cache
            .get_or_compute(key, || async move {
                if !self.limiters.wait_for_token(limiter, weight, timeout).await? {
                    tracing::warn!(limiter, weight, "no permit before timeout");
                    return Err(ThrottleError::Throttled { limiter: limiter.to_string(), timeout });
                }
                producer().await
            })
            .await
    }
}
