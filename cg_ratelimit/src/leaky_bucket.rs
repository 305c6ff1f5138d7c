use std::sync::Arc;

use cg_clock::SharedClock;
use cg_clock::SystemClock;
use cg_clock::nanos_to_secs_f64;
use parking_lot::Mutex;

use crate::EPSILON;
use crate::config::LimiterParams;
use crate::error::Result;
use crate::limiter::RateLimiter;

/// Leaky bucket rate limiter
///
/// The bucket holds the weight of admitted requests that downstream has not
/// processed yet. It leaks at a constant `rate` per second, and a request is
/// admitted only while its weight still fits under `capacity`. Requests that
/// do not fit are rejected rather than queued, which smooths traffic instead
/// of allowing bursts.
pub struct LeakyBucket {
    state: Mutex<QueueState>,

    /// Weight drained per second
    rate: f64,

    /// Maximum queued weight
    capacity: f64,

    clock: SharedClock,
}

#[derive(Debug)]
struct QueueState {
    queued: f64,
    last_drain: u64,
}

impl LeakyBucket {
    /// Create a new leaky bucket on the system clock
    pub fn new(capacity: f64, rate: f64) -> Result<Self> {
        Self::with_clock(capacity, rate, Arc::new(SystemClock::new()))
    }

    /// Create a leaky bucket that reads time from `clock`
    pub fn with_clock(capacity: f64, rate: f64, clock: SharedClock) -> Result<Self> {
        let params = LimiterParams::new(rate).with_capacity(capacity);
        let rate = params.checked_rate()?;
        let capacity = params.checked_capacity()?;

        let now = clock.now_nanos();
        tracing::debug!(rate, capacity, "leaky bucket created");

        Ok(Self { state: Mutex::new(QueueState { queued: 0.0, last_drain: now }), rate, capacity, clock })
    }

    /// Create a builder for configuring a leaky bucket
    pub fn builder() -> LeakyBucketBuilder {
        LeakyBucketBuilder::new()
    }

    /// Weight admitted but not yet drained
    pub fn queue_size(&self) -> f64 {
        let mut state = self.state.lock();
        self.drain_locked(&mut state);
        state.queued
    }

    /// Remove the weight processed since the last drain
    #[inline(always)]
    fn drain_locked(&self, state: &mut QueueState) {
        let now = self.clock.now_nanos();
        let elapsed = now.saturating_sub(state.last_drain);
        if elapsed == 0 {
            return;
        }

        state.queued = (state.queued - nanos_to_secs_f64(elapsed) * self.rate).max(0.0);
        state.last_drain = now;
    }
}

impl RateLimiter for LeakyBucket {
    fn acquire(&self, weight: u32) -> bool {
        if weight == 0 {
            return true;
        }

        let mut state = self.state.lock();
        self.drain_locked(&mut state);

        let queued = state.queued + weight as f64;
        if queued > self.capacity + EPSILON {
            return false;
        }

        state.queued = queued.min(self.capacity);
        true
    }

    fn available(&self) -> f64 {
        self.capacity - self.queue_size()
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn capacity(&self) -> f64 {
        self.capacity
    }

    fn reset(&self) {
        let now = self.clock.now_nanos();
        let mut state = self.state.lock();
        state.queued = 0.0;
        state.last_drain = now;
    }

    fn kind(&self) -> &'static str {
        "leaky_bucket"
    }
}

/// Builder for configuring a leaky bucket rate limiter
pub struct LeakyBucketBuilder {
    capacity: Option<f64>,
    rate: Option<f64>,
    clock: Option<SharedClock>,
}

impl LeakyBucketBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self { capacity: None, rate: None, clock: None }
    }

    /// Set the bucket capacity (max queued weight)
    pub fn capacity(mut self, capacity: f64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Set the drain rate in weight per second
    pub fn rate_per_second(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Set rate in requests per minute
    pub fn rate_per_minute(mut self, rate: f64) -> Self {
        self.rate = Some(rate / 60.0);
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the leaky bucket
    ///
    /// Capacity defaults to one second of drain (at least one).
    pub fn build(self) -> Result<LeakyBucket> {
        let mut params = LimiterParams::new(self.rate.unwrap_or(0.0));
        params.capacity = self.capacity;
        let rate = params.checked_rate()?;
        let capacity = params.checked_capacity()?;
        let clock = self.clock.unwrap_or_else(cg_clock::system_clock);
        LeakyBucket::with_clock(capacity, rate, clock)
    }
}

impl Default for LeakyBucketBuilder {
    fn default() -> Self {
        Self::new()
    }
}
