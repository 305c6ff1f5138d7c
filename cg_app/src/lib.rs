//! # cg_app
//!
//! Wiring for services that sit in front of rate-limited, expensive
//! generation providers: config loading, tracing, and the [`Throttle`]
//! composition root that pairs a limiter registry with a response cache.

pub mod cli;
pub mod config_loader;
pub mod throttle;
pub mod tracing_setup;

pub use throttle::Throttle;
pub use throttle::ThrottleError;
