use std::sync::Arc;

use cg_clock::SharedClock;
use cg_clock::SystemClock;
use cg_clock::nanos_to_secs_f64;
use parking_lot::Mutex;

use crate::EPSILON;
use crate::config::LimiterParams;
use crate::error::Result;
use crate::limiter::RateLimiter;

/// Token bucket rate limiter
///
/// Tokens accumulate continuously at `rate` per second up to `capacity`.
/// A request for `n` permits succeeds when at least `n` tokens are present,
/// so an idle bucket allows a burst of up to `capacity` permits.
pub struct TokenBucket {
    state: Mutex<BucketState>,

    /// Tokens generated per second
    rate: f64,

    /// Maximum number of stored tokens
    capacity: f64,

    clock: SharedClock,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: u64,
}

impl TokenBucket {
    /// Create a token bucket on the system clock
    pub fn new(rate: f64, capacity: f64) -> Result<Self> {
        Self::with_clock(rate, capacity, Arc::new(SystemClock::new()))
    }

    /// Create a token bucket that reads time from `clock`
    pub fn with_clock(rate: f64, capacity: f64, clock: SharedClock) -> Result<Self> {
        let params = LimiterParams::new(rate).with_capacity(capacity);
        let rate = params.checked_rate()?;
        let capacity = params.checked_capacity()?;

        let now = clock.now_nanos();
        tracing::debug!(rate, capacity, "token bucket created");

        Ok(Self { state: Mutex::new(BucketState { tokens: capacity, last_refill: now }), rate, capacity, clock })
    }

    /// Token bucket allowing `rate` requests per second with a one second burst
    pub fn per_second(rate: f64) -> Result<Self> {
        Self::new(rate, rate.max(1.0))
    }

    /// Create a builder for configuring a token bucket
    pub fn builder() -> TokenBucketBuilder {
        TokenBucketBuilder::new()
    }

    /// Add the tokens generated since the last refill, capped at capacity
    #[inline(always)]
    fn refill_locked(&self, state: &mut BucketState) {
        let now = self.clock.now_nanos();
        let elapsed = now.saturating_sub(state.last_refill);
        if elapsed == 0 {
            return;
        }

        state.tokens = (state.tokens + nanos_to_secs_f64(elapsed) * self.rate).min(self.capacity);
        state.last_refill = now;
    }
}

impl RateLimiter for TokenBucket {
    fn acquire(&self, weight: u32) -> bool {
        if weight == 0 {
            return true;
        }

        let mut state = self.state.lock();
        self.refill_locked(&mut state);

        let required = weight as f64;
        if state.tokens + EPSILON < required {
            return false;
        }

        state.tokens = (state.tokens - required).max(0.0);
        true
    }

    fn available(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill_locked(&mut state);
        state.tokens
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
        state.tokens = self.capacity;
        state.last_refill = now;
    }

    fn kind(&self) -> &'static str {
        "token_bucket"
    }
}

/// Builder for configuring a token bucket
pub struct TokenBucketBuilder {
    rate: Option<f64>,
    capacity: Option<f64>,
    clock: Option<SharedClock>,
}

impl TokenBucketBuilder {
    pub fn new() -> Self {
        Self { rate: None, capacity: None, clock: None }
    }

    /// Set the refill rate in tokens per second
    pub fn rate_per_second(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Set the refill rate in tokens per minute
    pub fn rate_per_minute(mut self, rate: f64) -> Self {
        self.rate = Some(rate / 60.0);
        self
    }

    /// Set the burst capacity
    pub fn capacity(mut self, capacity: f64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the token bucket
    ///
    /// Capacity defaults to one second's worth of tokens (at least one).
    pub fn build(self) -> Result<TokenBucket> {
        let mut params = LimiterParams::new(self.rate.unwrap_or(0.0));
        params.capacity = self.capacity;
        let rate = params.checked_rate()?;
        let capacity = params.checked_capacity()?;
        let clock = self.clock.unwrap_or_else(cg_clock::system_clock);
        TokenBucket::with_clock(rate, capacity, clock)
    }
}

impl Default for TokenBucketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cg_clock::ManualClock;
    use proptest::prelude::*;

    use super::*;
    use crate::error::RateLimitError;

    fn manual_bucket(rate: f64, capacity: f64) -> (TokenBucket, Arc<ManualClock>) {
        let clock = ManualClock::shared();
        let bucket = TokenBucket::with_clock(rate, capacity, clock.clone()).unwrap();
        (bucket, clock)
    }

    #[test]
    fn test_creation() {
        let (bucket, _) = manual_bucket(5.0, 10.0);
        assert_eq!(bucket.rate(), 5.0);
        assert_eq!(bucket.capacity(), 10.0);
        assert_eq!(bucket.available(), 10.0);
        assert_eq!(bucket.kind(), "token_bucket");
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(TokenBucket::new(0.0, 5.0), Err(RateLimitError::InvalidConfig(_))));
        assert!(matches!(TokenBucket::new(5.0, -1.0), Err(RateLimitError::InvalidConfig(_))));
        assert!(matches!(TokenBucket::builder().capacity(5.0).build(), Err(RateLimitError::InvalidConfig(_))));
    }

    #[test]
    fn test_burst_then_refill() {
        let (bucket, clock) = manual_bucket(5.0, 5.0);

        assert!(bucket.acquire(5));
        assert!(!bucket.acquire(1));

        // 0.2s at 5 tokens/s regenerates exactly one token
        clock.advance(Duration::from_millis(200));
        assert!(bucket.acquire(1));
        assert!(!bucket.acquire(1));
    }

    #[test]
    fn test_refused_acquire_leaves_state() {
        let (bucket, _) = manual_bucket(1.0, 3.0);

        assert!(bucket.acquire(2));
        assert!(!bucket.acquire(2));
        assert_eq!(bucket.available(), 1.0);
    }

    #[test]
    fn test_fractional_refill() {
        let (bucket, clock) = manual_bucket(0.5, 1.0);

        assert!(bucket.acquire(1));
        clock.advance(Duration::from_secs(1));
        assert!((bucket.available() - 0.5).abs() < 1e-9);
        assert!(!bucket.acquire(1));

        clock.advance(Duration::from_secs(1));
        assert!(bucket.acquire(1));
    }

    #[test]
    fn test_idle_refills_to_capacity_only() {
        let (bucket, clock) = manual_bucket(10.0, 20.0);

        assert!(bucket.acquire(20));
        clock.advance(Duration::from_secs(2));
        assert!((bucket.available() - 20.0).abs() < 1e-9);

        clock.advance(Duration::from_secs(60));
        assert_eq!(bucket.available(), 20.0);
    }

    #[test]
    fn test_reset() {
        let (bucket, _) = manual_bucket(1.0, 10.0);

        assert!(bucket.acquire(7));
        bucket.reset();
        assert_eq!(bucket.available(), 10.0);
    }

    #[test]
    fn test_zero_weight() {
        let (bucket, _) = manual_bucket(1.0, 1.0);
        assert!(bucket.acquire(1));
        assert!(bucket.acquire(0));
        assert_eq!(bucket.available(), 0.0);
    }

    #[test]
    fn test_builder() {
        let bucket = TokenBucket::builder().rate_per_minute(120.0).build().unwrap();
        assert_eq!(bucket.rate(), 2.0);
        assert_eq!(bucket.capacity(), 2.0);

        let bucket = TokenBucket::builder().rate_per_second(4.0).capacity(40.0).build().unwrap();
        assert_eq!(bucket.capacity(), 40.0);
    }

    #[test]
    fn test_snapshot() {
        let (bucket, _) = manual_bucket(2.0, 4.0);
        assert!(bucket.acquire(1));

        let snapshot = bucket.snapshot();
        assert_eq!(snapshot.strategy, "token_bucket");
        assert_eq!(snapshot.rate, 2.0);
        assert_eq!(snapshot.capacity, 4.0);
        assert_eq!(snapshot.available, 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_token_times_out_on_frozen_clock() {
        let (bucket, _) = manual_bucket(1.0, 1.0);
        assert!(bucket.acquire(1));

        let started = tokio::time::Instant::now();
        assert!(!bucket.wait_for_token(1, Duration::from_millis(300)).await);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_wait_for_token_real_clock() {
        let bucket = TokenBucket::new(20.0, 1.0).unwrap();
        assert!(bucket.acquire(1));

        // One token every 50ms
        assert!(bucket.wait_for_token(1, Duration::from_secs(2)).await);
    }

    #[test]
    fn test_concurrent_access() {
        let (bucket, _) = manual_bucket(1.0, 1000.0);
        let bucket = Arc::new(bucket);
        let mut handles = vec![];

        for _ in 0..10 {
            let bucket_clone = Arc::clone(&bucket);
            let handle = std::thread::spawn(move || {
                let mut acquired = 0;
                for _ in 0..150 {
                    if bucket_clone.acquire(1) {
                        acquired += 1;
                    }
                }
                acquired
            });
            handles.push(handle);
        }

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 1000);
    }

    proptest! {
        #[test]
        fn prop_tokens_stay_within_bounds(
            rate in 0.1f64..100.0,
            capacity in 1.0f64..50.0,
            steps in prop::collection::vec((0u32..10, 0u64..2_000), 1..64),
        ) {
            let (bucket, clock) = manual_bucket(rate, capacity);

            for (weight, advance_ms) in steps {
                clock.advance(Duration::from_millis(advance_ms));
                let before = bucket.available();
                let granted = bucket.acquire(weight);
                let after = bucket.available();

                prop_assert!(after >= 0.0);
                prop_assert!(after <= capacity);
                if !granted {
                    prop_assert!((after - before).abs() < 1e-9);
                }
            }
        }
    }
}
