//! # cg_clock
//!
//! Monotonic time sources shared by the rate limiters and the response cache.
//!
//! Every time-dependent component takes a [`SharedClock`] so tests can swap in a
//! [`ManualClock`] and move time forward without sleeping.

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

/// Monotonic time source
pub trait Clock: Send + Sync + Debug {
    /// Nanoseconds elapsed since this clock's epoch. Never decreases.
    fn now_nanos(&self) -> u64;

    /// Time elapsed since this clock's epoch
    fn now(&self) -> Duration {
        Duration::from_nanos(self.now_nanos())
    }
}

/// Clock handle shared between a component and whoever drives it
pub type SharedClock = Arc<dyn Clock>;

/// Wall clock backed by [`Instant`]
///
/// The epoch is the instant the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    #[inline(always)]
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[inline(always)]
    fn now_nanos(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }
}

/// Clock that only moves when told to
///
/// Starts at zero. Clone the `Arc` into the component under test and call
/// [`ManualClock::advance`] from the test body.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { nanos: AtomicU64::new(0) }
    }

    /// Create a manual clock already wrapped for sharing
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(duration_to_nanos(by), Ordering::AcqRel);
    }

    /// Move time forward by fractional seconds
    pub fn advance_secs_f64(&self, secs: f64) {
        self.nanos.fetch_add(secs_f64_to_nanos(secs), Ordering::AcqRel);
    }

    /// Jump to an absolute offset from the epoch. Going backwards is ignored.
    pub fn set(&self, at: Duration) {
        self.nanos.fetch_max(duration_to_nanos(at), Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    #[inline(always)]
    fn now_nanos(&self) -> u64 {
        self.nanos.load(Ordering::Acquire)
    }
}

/// Fresh [`SystemClock`] behind a [`SharedClock`]
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock::new())
}

/// Convert seconds to nanoseconds
#[inline(always)]
pub const fn secs_to_nanos(secs: u64) -> u64 {
    secs * 1_000_000_000
}

/// Convert milliseconds to nanoseconds
#[inline(always)]
pub const fn millis_to_nanos(millis: u64) -> u64 {
    millis * 1_000_000
}

/// Convert duration to nanoseconds, saturating at `u64::MAX` (about 584 years)
#[inline(always)]
pub fn duration_to_nanos(duration: Duration) -> u64 {
    checked_duration_to_nanos(duration).unwrap_or(u64::MAX)
}

/// Convert duration to nanoseconds, `None` when it does not fit in a `u64`
#[inline(always)]
pub fn checked_duration_to_nanos(duration: Duration) -> Option<u64> {
    u64::try_from(duration.as_nanos()).ok()
}

/// Convert fractional seconds to nanoseconds, clamping negatives and NaN to zero
#[inline(always)]
pub fn secs_f64_to_nanos(secs: f64) -> u64 {
    if secs.is_nan() || secs <= 0.0 {
        return 0;
    }
    (secs * 1_000_000_000.0) as u64
}

/// Convert nanoseconds to fractional seconds
#[inline(always)]
pub fn nanos_to_secs_f64(nanos: u64) -> f64 {
    nanos as f64 / 1_000_000_000.0
}
