use std::sync::Arc;
use std::time::Duration;

use cg_clock::SharedClock;
use cg_clock::SystemClock;
use cg_clock::checked_duration_to_nanos;
use parking_lot::Mutex;

use crate::error::RateLimitError;
use crate::error::Result;
use crate::limiter::RateLimiter;

/// Fixed window rate limiter with hard resets at window boundaries
///
/// The fixed window algorithm divides time into fixed-size windows and allows
/// a maximum number of requests within each window. When a window expires,
/// the counter resets to the limit.
///
/// Two full quotas can be spent back to back across a boundary (the end of one
/// window and the start of the next). Use [`crate::SlidingWindow`] when that
/// burst is not acceptable.
pub struct FixedWindow {
    state: Mutex<WindowState>,

    /// Maximum requests allowed per window
    limit: u32,

    /// Window duration in nanoseconds
    window_nanos: u64,

    clock: SharedClock,
}

#[derive(Debug)]
struct WindowState {
    /// Start of the current window, aligned to whole windows since creation
    window_start: u64,

    /// Permits granted in the current window
    count: u32,
}

impl FixedWindow {
    /// Create a new fixed window rate limiter on the system clock
    pub fn new(limit: u32, window: Duration) -> Result<Self> {
        Self::with_clock(limit, window, Arc::new(SystemClock::new()))
    }

    /// Create a fixed window limiter that reads time from `clock`
    pub fn with_clock(limit: u32, window: Duration, clock: SharedClock) -> Result<Self> {
        if limit == 0 {
            return Err(RateLimitError::InvalidConfig("window limit must be greater than 0".to_string()));
        }
        if window.is_zero() {
            return Err(RateLimitError::InvalidConfig("window duration must be greater than 0".to_string()));
        }
        let window_nanos = checked_duration_to_nanos(window)
            .ok_or_else(|| RateLimitError::InvalidConfig(format!("window duration {window:?} exceeds the clock range")))?;

        let now = clock.now_nanos();
        tracing::debug!(limit, window_secs = window.as_secs_f64(), "fixed window created");

        Ok(Self { state: Mutex::new(WindowState { window_start: now, count: 0 }), limit, window_nanos, clock })
    }

    /// Create a fixed window limiter with per-second limit
    pub fn per_second(limit: u32) -> Result<Self> {
        Self::new(limit, Duration::from_secs(1))
    }

    /// Create a fixed window limiter with per-minute limit
    pub fn per_minute(limit: u32) -> Result<Self> {
        Self::new(limit, Duration::from_secs(60))
    }

    /// Create a fixed window limiter with per-hour limit
    pub fn per_hour(limit: u32) -> Result<Self> {
        Self::new(limit, Duration::from_secs(3600))
    }

    /// Create a builder for configuring a fixed window limiter
    pub fn builder() -> FixedWindowBuilder {
        FixedWindowBuilder::new()
    }

    /// Window length
    pub fn window(&self) -> Duration {
        Duration::from_nanos(self.window_nanos)
    }

    /// Time left until the current window closes
    pub fn time_until_reset(&self) -> Duration {
        let mut state = self.state.lock();
        let now = self.roll_window_locked(&mut state);
        let elapsed = now.saturating_sub(state.window_start);
        Duration::from_nanos(self.window_nanos.saturating_sub(elapsed))
    }

    /// Move to the window containing now, clearing the counter if it changed
    ///
    /// Jumps straight to the current window however many have passed.
    #[inline(always)]
    fn roll_window_locked(&self, state: &mut WindowState) -> u64 {
        let now = self.clock.now_nanos();
        let elapsed = now.saturating_sub(state.window_start);

        if elapsed >= self.window_nanos {
            let windows_elapsed = elapsed / self.window_nanos;
            state.window_start += windows_elapsed * self.window_nanos;
            state.count = 0;
        }

        now
    }
}

impl RateLimiter for FixedWindow {
    fn acquire(&self, weight: u32) -> bool {
        if weight == 0 {
            return true;
        }

        let mut state = self.state.lock();
        self.roll_window_locked(&mut state);

        match state.count.checked_add(weight) {
            Some(new_count) if new_count <= self.limit => {
                state.count = new_count;
                true
            }
            _ => false,
        }
    }

    fn available(&self) -> f64 {
        let mut state = self.state.lock();
        self.roll_window_locked(&mut state);
        self.limit.saturating_sub(state.count) as f64
    }

    fn rate(&self) -> f64 {
        self.limit as f64
    }

    fn capacity(&self) -> f64 {
        self.limit as f64
    }

    fn reset(&self) {
        let now = self.clock.now_nanos();
        let mut state = self.state.lock();
        state.count = 0;
        state.window_start = now;
    }

    fn kind(&self) -> &'static str {
        "fixed_window"
    }
}

/// Builder for configuring a fixed window rate limiter
pub struct FixedWindowBuilder {
    limit: Option<u32>,
    window: Option<Duration>,
    clock: Option<SharedClock>,
}

impl FixedWindowBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self { limit: None, window: None, clock: None }
    }

    /// Set the limit (max requests per window)
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the window duration
    pub fn window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    /// Set window to 1 second
    pub fn per_second(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self.window = Some(Duration::from_secs(1));
        self
    }

    /// Set window to 1 minute
    pub fn per_minute(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self.window = Some(Duration::from_secs(60));
        self
    }

    /// Set window to 1 hour
    pub fn per_hour(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self.window = Some(Duration::from_secs(3600));
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the fixed window limiter
    pub fn build(self) -> Result<FixedWindow> {
        let limit = self.limit.ok_or_else(|| RateLimitError::InvalidConfig("limit must be set".to_string()))?;
        let window = self.window.ok_or_else(|| RateLimitError::InvalidConfig("window must be set".to_string()))?;
        let clock = self.clock.unwrap_or_else(cg_clock::system_clock);
        FixedWindow::with_clock(limit, window, clock)
    }
}

impl Default for FixedWindowBuilder {
    fn default() -> Self {
        Self::new()
    }
}
