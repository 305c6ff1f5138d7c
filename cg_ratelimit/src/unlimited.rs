use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::limiter::RateLimiter;

/// Limiter that grants every request
///
/// Stands in for a limiter that is disabled in configuration so callers never
/// branch on whether limiting is switched on.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unlimited;

impl Unlimited {
    pub fn new() -> Self {
        Self
    }
}

impl RateLimiter for Unlimited {
    fn acquire(&self, _weight: u32) -> bool {
        true
    }

    fn wait_for_token(&self, _weight: u32, _timeout: Duration) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(async { true })
    }

    fn available(&self) -> f64 {
        f64::INFINITY
    }

    fn rate(&self) -> f64 {
        f64::INFINITY
    }

    fn capacity(&self) -> f64 {
        f64::INFINITY
    }

    fn reset(&self) {}

    fn kind(&self) -> &'static str {
        "unlimited"
    }
}
