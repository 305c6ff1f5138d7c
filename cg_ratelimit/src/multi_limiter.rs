use std::sync::Arc;
use std::time::Duration;

use cg_clock::SharedClock;
use parking_lot::RwLock;
use rapidhash::RapidHashMap;

use crate::config::LimiterConfig;
use crate::config::LimiterParams;
use crate::error::RateLimitError;
use crate::error::Result;
use crate::factory::RateLimiterFactory;
use crate::limiter::LimiterSnapshot;
use crate::limiter::RateLimiter;

/// Registry of independently configured, named rate limiters
///
/// Each outbound service gets its own limiter (for example `"image_api"` on a
/// leaky bucket and `"text_api"` on a token bucket). Calls are routed by name.
/// Looking up a name that was never registered is an error; nothing is
/// created on demand.
pub struct MultiRateLimiter {
    limiters: RwLock<RapidHashMap<String, Arc<dyn RateLimiter>>>,

    /// Clock handed to limiters created through [`MultiRateLimiter::add_limiter`]
    clock: SharedClock,
}

impl MultiRateLimiter {
    /// Create an empty registry on the system clock
    pub fn new() -> Self {
        Self::with_clock(cg_clock::system_clock())
    }

    /// Create an empty registry whose limiters read time from `clock`
    pub fn with_clock(clock: SharedClock) -> Self {
        Self { limiters: RwLock::new(RapidHashMap::default()), clock }
    }

    /// Create a new multi-limiter builder
    pub fn builder() -> MultiRateLimiterBuilder {
        MultiRateLimiterBuilder::new()
    }

    /// Build a registry from named configuration entries
    pub fn from_configs<'a, I>(configs: I, clock: SharedClock) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a LimiterConfig)>,
    {
        let registry = Self::with_clock(clock);
        for (name, config) in configs {
            let limiter = RateLimiterFactory::from_config(config, registry.clock.clone())?;
            registry.insert(name.clone(), limiter);
        }
        Ok(registry)
    }

    /// Create and register a limiter, replacing any limiter with the same name
    pub fn add_limiter(&self, name: impl Into<String>, strategy: &str, params: &LimiterParams) -> Result<()> {
        let limiter = RateLimiterFactory::create(strategy, params, self.clock.clone())?;
        self.insert(name, limiter);
        Ok(())
    }

    /// Register an existing limiter, replacing any limiter with the same name
    pub fn insert(&self, name: impl Into<String>, limiter: Arc<dyn RateLimiter>) {
        let name = name.into();
        tracing::debug!(name = %name, strategy = limiter.kind(), "registering rate limiter");

        if self.limiters.write().insert(name.clone(), limiter).is_some() {
            tracing::debug!(name = %name, "replaced existing rate limiter");
        }
    }

    /// Unregister a limiter. Returns whether it existed.
    pub fn remove_limiter(&self, name: &str) -> bool {
        self.limiters.write().remove(name).is_some()
    }

    /// Look up a limiter for direct inspection
    pub fn get_limiter(&self, name: &str) -> Result<Arc<dyn RateLimiter>> {
        self.limiters.read().get(name).cloned().ok_or_else(|| RateLimitError::LimiterNotFound(name.to_string()))
    }

    /// Try to take `weight` permits from the named limiter without blocking
    pub fn acquire(&self, name: &str, weight: u32) -> Result<bool> {
        Ok(self.get_limiter(name)?.acquire(weight))
    }

    /// Wait up to `timeout` for `weight` permits from the named limiter
    ///
    /// The registry lock is released before waiting.
    pub async fn wait_for_token(&self, name: &str, weight: u32, timeout: Duration) -> Result<bool> {
        let limiter = self.get_limiter(name)?;
        Ok(limiter.wait_for_token(weight, timeout).await)
    }

    /// Registered names in sorted order
    pub fn list_limiters(&self) -> Vec<String> {
        let mut names: Vec<String> = self.limiters.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of every registered limiter, sorted by name
    pub fn snapshots(&self) -> Vec<(String, LimiterSnapshot)> {
        let limiters: Vec<(String, Arc<dyn RateLimiter>)> =
            self.limiters.read().iter().map(|(name, limiter)| (name.clone(), Arc::clone(limiter))).collect();

        let mut snapshots: Vec<(String, LimiterSnapshot)> = limiters.into_iter().map(|(name, limiter)| (name, limiter.snapshot())).collect();
        snapshots.sort_by(|a, b| a.0.cmp(&b.0));
        snapshots
    }

    /// Reset all limiters
    pub fn reset_all(&self) {
        for limiter in self.limiters.read().values() {
            limiter.reset();
        }
    }

    pub fn len(&self) -> usize {
        self.limiters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.read().is_empty()
    }
}

impl Default for MultiRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating a multi-limiter
pub struct MultiRateLimiterBuilder {
    limiters: Vec<(String, Arc<dyn RateLimiter>)>,
    clock: Option<SharedClock>,
}

impl MultiRateLimiterBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self { limiters: Vec::new(), clock: None }
    }

    /// Register a limiter under `name`. Later entries win on duplicate names.
    pub fn with_limiter<L: RateLimiter + 'static>(mut self, name: impl Into<String>, limiter: L) -> Self {
        self.limiters.push((name.into(), Arc::new(limiter)));
        self
    }

    /// Register an Arc-wrapped rate limiter
    pub fn with_limiter_arc(mut self, name: impl Into<String>, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiters.push((name.into(), limiter));
        self
    }

    /// Clock for limiters later created through `add_limiter`
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the multi-limiter
    pub fn build(self) -> MultiRateLimiter {
        let registry = MultiRateLimiter::with_clock(self.clock.unwrap_or_else(cg_clock::system_clock));
        for (name, limiter) in self.limiters {
            registry.insert(name, limiter);
        }
        registry
    }
}

impl Default for MultiRateLimiterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
