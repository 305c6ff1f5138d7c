use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;

/// Sleep between attempts while waiting for a permit
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Core trait for all rate limiting implementations
///
/// Implementations keep their state behind a lock scoped to the instance, so a
/// single limiter can be shared across threads through an `Arc`.
pub trait RateLimiter: Send + Sync {
    /// Try to take `weight` permits without blocking.
    ///
    /// Either all permits are granted or none are; a refusal leaves the
    /// limiter untouched.
    fn acquire(&self, weight: u32) -> bool;

    /// Try to take a single permit without blocking
    fn acquire_one(&self) -> bool {
        self.acquire(1)
    }

    /// Wait until `weight` permits are granted or `timeout` runs out.
    ///
    /// Resolves to `false` on timeout. The limiter's lock is released between
    /// attempts.
    fn wait_for_token(&self, weight: u32, timeout: Duration) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(poll_until_acquired(self, weight, timeout))
    }

    /// Permits that could be granted right now
    fn available(&self) -> f64;

    /// Configured rate (permits per second, or per window for window strategies)
    fn rate(&self) -> f64;

    /// Maximum permits that can ever be outstanding
    fn capacity(&self) -> f64;

    /// Restore the limiter to its freshly constructed state
    fn reset(&self);

    /// Strategy tag, e.g. `"token_bucket"`
    ///
    /// Matches [`Strategy::as_str`](crate::Strategy::as_str) for the four
    /// strategies. The pass-through limiter reports `"unlimited"`, which has no
    /// `Strategy` variant, hence a string rather than the enum.
    fn kind(&self) -> &'static str;

    /// Point-in-time view for logging and inspection
    fn snapshot(&self) -> LimiterSnapshot {
        LimiterSnapshot { strategy: self.kind(), rate: self.rate(), capacity: self.capacity(), available: self.available() }
    }
}

/// Point-in-time view of a limiter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimiterSnapshot {
    /// Same value as [`RateLimiter::kind`]
    pub strategy: &'static str,
    pub rate: f64,
    pub capacity: f64,
    pub available: f64,
}

/// Poll `acquire` every [`POLL_INTERVAL`] until it succeeds or the deadline passes
///
/// The deadline is measured on tokio's clock, not the limiter's, so a frozen
/// test clock cannot block the caller forever.
pub(crate) async fn poll_until_acquired<L>(limiter: &L, weight: u32, timeout: Duration) -> bool
where
    L: RateLimiter + ?Sized,
{
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if limiter.acquire(weight) {
            return true;
        }

        let now = tokio::time::Instant::now();
        if now >= deadline {
            return false;
        }

        tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}
