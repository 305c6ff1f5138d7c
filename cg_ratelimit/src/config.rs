use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::error::RateLimitError;
use crate::error::Result;

/// Window length used when a window strategy is configured without one
pub const DEFAULT_WINDOW_SECS: f64 = 1.0;

/// Rate limiting algorithm selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    TokenBucket,
    FixedWindow,
    SlidingWindow,
    LeakyBucket,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [Strategy::TokenBucket, Strategy::FixedWindow, Strategy::SlidingWindow, Strategy::LeakyBucket];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::TokenBucket => "token_bucket",
            Strategy::FixedWindow => "fixed_window",
            Strategy::SlidingWindow => "sliding_window",
            Strategy::LeakyBucket => "leaky_bucket",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = RateLimitError;

    fn from_str(s: &str) -> Result<Self> {
        Strategy::ALL.into_iter().find(|strategy| strategy.as_str() == s).ok_or_else(|| RateLimitError::UnknownStrategy(s.to_string()))
    }
}

/// Numeric parameters shared by all strategies
///
/// - token bucket / leaky bucket: `rate` per second, `capacity` burst or queue
///   size (defaults to `max(rate, 1)`)
/// - fixed / sliding window: `rate` permits per `window_secs` (defaults to 1s)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimiterParams {
    pub rate: f64,

    #[serde(default)]
    pub capacity: Option<f64>,

    #[serde(default)]
    pub window_secs: Option<f64>,
}

impl LimiterParams {
    pub fn new(rate: f64) -> Self {
        Self { rate, capacity: None, window_secs: None }
    }

    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_window_secs(mut self, window_secs: f64) -> Self {
        self.window_secs = Some(window_secs);
        self
    }

    /// Rate, rejecting zero, negative and non-finite values
    pub fn checked_rate(&self) -> Result<f64> {
        positive("rate", self.rate)
    }

    /// Capacity, falling back to one second's worth of rate (at least one permit)
    pub fn checked_capacity(&self) -> Result<f64> {
        match self.capacity {
            Some(capacity) => positive("capacity", capacity),
            None => Ok(self.checked_rate()?.max(1.0)),
        }
    }

    /// Window length, falling back to [`DEFAULT_WINDOW_SECS`]
    pub fn checked_window(&self) -> Result<Duration> {
        let secs = positive("window_secs", self.window_secs.unwrap_or(DEFAULT_WINDOW_SECS))?;
        Duration::try_from_secs_f64(secs)
            .ok()
            .filter(|window| cg_clock::checked_duration_to_nanos(*window).is_some())
            .ok_or_else(|| RateLimitError::InvalidConfig(format!("window_secs {secs} out of range")))
    }

    /// Whole permits per window for the window strategies
    pub fn checked_limit(&self) -> Result<u32> {
        let limit = self.checked_rate()?.floor();
        if limit < 1.0 {
            return Err(RateLimitError::InvalidConfig(format!("window limit must be at least 1 permit, got {}", self.rate)));
        }
        Ok(limit.min(u32::MAX as f64) as u32)
    }
}

/// One named limiter as it appears in a configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    pub strategy: Strategy,

    #[serde(flatten)]
    pub params: LimiterParams,

    /// A disabled limiter grants every request
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl LimiterConfig {
    pub fn new(strategy: Strategy, params: LimiterParams) -> Self {
        Self { strategy, params, enabled: true }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

fn default_enabled() -> bool {
    true
}

fn positive(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(RateLimitError::InvalidConfig(format!("{field} must be a positive finite number, got {value}")));
    }
    Ok(value)
}
