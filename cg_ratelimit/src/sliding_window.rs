use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use cg_clock::SharedClock;
use cg_clock::SystemClock;
use cg_clock::checked_duration_to_nanos;
use parking_lot::Mutex;

use crate::error::RateLimitError;
use crate::error::Result;
use crate::limiter::RateLimiter;

/// Sliding window log rate limiter
///
/// Keeps a timestamped log of granted requests and allows at most `limit`
/// permits in any trailing window. A permit granted at `t` stops counting at
/// `t + window`. Unlike [`crate::FixedWindow`] there is no burst at window
/// boundaries.
pub struct SlidingWindow {
    state: Mutex<LogState>,

    /// Maximum permits in any trailing window
    limit: u32,

    /// Window duration in nanoseconds
    window_nanos: u64,

    clock: SharedClock,
}

#[derive(Debug, Default)]
struct LogState {
    /// Grant timestamps paired with their weight, oldest first
    log: VecDeque<(u64, u32)>,

    /// Sum of the weights in `log`
    in_window: u32,
}

impl SlidingWindow {
    /// Create a sliding window limiter on the system clock
    pub fn new(limit: u32, window: Duration) -> Result<Self> {
        Self::with_clock(limit, window, Arc::new(SystemClock::new()))
    }

    /// Create a sliding window limiter that reads time from `clock`
    pub fn with_clock(limit: u32, window: Duration, clock: SharedClock) -> Result<Self> {
        if limit == 0 {
            return Err(RateLimitError::InvalidConfig("window limit must be greater than 0".to_string()));
        }
        if window.is_zero() {
            return Err(RateLimitError::InvalidConfig("window duration must be greater than 0".to_string()));
        }
        let window_nanos = checked_duration_to_nanos(window)
            .ok_or_else(|| RateLimitError::InvalidConfig(format!("window duration {window:?} exceeds the clock range")))?;

        tracing::debug!(limit, window_secs = window.as_secs_f64(), "sliding window created");

        Ok(Self { state: Mutex::new(LogState::default()), limit, window_nanos, clock })
    }

    /// Create a sliding window limiter with per-second limit
    pub fn per_second(limit: u32) -> Result<Self> {
        Self::new(limit, Duration::from_secs(1))
    }

    /// Create a sliding window limiter with per-minute limit
    pub fn per_minute(limit: u32) -> Result<Self> {
        Self::new(limit, Duration::from_secs(60))
    }

    /// Create a builder for configuring a sliding window limiter
    pub fn builder() -> SlidingWindowBuilder {
        SlidingWindowBuilder::new()
    }

    /// Window length
    pub fn window(&self) -> Duration {
        Duration::from_nanos(self.window_nanos)
    }

    /// Number of log entries currently retained
    pub fn log_len(&self) -> usize {
        let mut state = self.state.lock();
        self.prune_locked(&mut state);
        state.log.len()
    }

    /// Drop entries that have aged a full window or more
    #[inline(always)]
    fn prune_locked(&self, state: &mut LogState) -> u64 {
        let now = self.clock.now_nanos();

        while let Some(&(granted_at, weight)) = state.log.front() {
            if now.saturating_sub(granted_at) < self.window_nanos {
                break;
            }
            state.log.pop_front();
            state.in_window -= weight;
        }

        now
    }
}

impl RateLimiter for SlidingWindow {
    fn acquire(&self, weight: u32) -> bool {
        if weight == 0 {
            return true;
        }

        let mut state = self.state.lock();
        let now = self.prune_locked(&mut state);

        match state.in_window.checked_add(weight) {
            Some(total) if total <= self.limit => {
                state.log.push_back((now, weight));
                state.in_window = total;
                true
            }
            _ => false,
        }
    }

    fn available(&self) -> f64 {
        let mut state = self.state.lock();
        self.prune_locked(&mut state);
        self.limit.saturating_sub(state.in_window) as f64
    }

    fn rate(&self) -> f64 {
        self.limit as f64
    }

    fn capacity(&self) -> f64 {
        self.limit as f64
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        state.log.clear();
        state.in_window = 0;
    }

    fn kind(&self) -> &'static str {
        "sliding_window"
    }
}

/// Builder for configuring a sliding window rate limiter
pub struct SlidingWindowBuilder {
    limit: Option<u32>,
    window: Option<Duration>,
    clock: Option<SharedClock>,
}

impl SlidingWindowBuilder {
    pub fn new() -> Self {
        Self { limit: None, window: None, clock: None }
    }

    /// Set the limit (max permits per trailing window)
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<SlidingWindow> {
        let limit = self.limit.ok_or_else(|| RateLimitError::InvalidConfig("limit must be set".to_string()))?;
        let window = self.window.ok_or_else(|| RateLimitError::InvalidConfig("window must be set".to_string()))?;
        let clock = self.clock.unwrap_or_else(cg_clock::system_clock);
        SlidingWindow::with_clock(limit, window, clock)
    }
}

impl Default for SlidingWindowBuilder {
    fn default() -> Self {
        Self::new()
    }
}
