//! End-to-end behaviour of each strategy driven through the factory and the
//! registry with a manual clock.

use std::sync::Arc;
use std::time::Duration;

use cg_clock::ManualClock;
use cg_ratelimit::LimiterParams;
use cg_ratelimit::MultiRateLimiter;
use cg_ratelimit::RateLimiter;
use cg_ratelimit::RateLimiterFactory;
use cg_ratelimit::TokenBucket;

#[test]
fn test_token_bucket_burst_and_regenerate() {
    let clock = ManualClock::shared();
    let limiter = TokenBucket::with_clock(5.0, 5.0, clock.clone()).unwrap();

    assert!(limiter.acquire(5));
    assert!(!limiter.acquire(1));

    clock.advance(Duration::from_millis(200));
    assert!(limiter.acquire(1));
}

#[test]
fn test_token_bucket_fresh_and_full_refill() {
    for (rate, capacity) in [(1.0, 1.0), (5.0, 20.0), (0.25, 3.0), (100.0, 7.0)] {
        let clock = ManualClock::shared();
        let limiter = RateLimiterFactory::create("token_bucket", &LimiterParams::new(rate).with_capacity(capacity), clock.clone()).unwrap();

        assert_eq!(limiter.available(), capacity);

        assert!(limiter.acquire(capacity as u32));
        clock.advance_secs_f64(capacity / rate);
        assert!((limiter.available() - capacity).abs() < 1e-6, "rate={rate} capacity={capacity}");
    }
}

#[test]
fn test_fixed_window_quota_then_next_window() {
    let clock = ManualClock::shared();
    let limiter = RateLimiterFactory::create("fixed_window", &LimiterParams::new(3.0).with_window_secs(2.0), clock.clone()).unwrap();

    assert!(limiter.acquire(3));
    assert!(!limiter.acquire(1));

    clock.advance(Duration::from_secs(2));
    assert!(limiter.acquire(1));
}

#[test]
fn test_sliding_window_ages_out() {
    let clock = ManualClock::shared();
    let limiter = RateLimiterFactory::create("sliding_window", &LimiterParams::new(4.0).with_window_secs(10.0), clock.clone()).unwrap();

    assert!(limiter.acquire(4));

    clock.advance(Duration::from_secs(5));
    assert!(!limiter.acquire(1));

    clock.advance(Duration::from_secs(5));
    assert!(limiter.acquire(1));
}

#[test]
fn test_leaky_bucket_capacity_then_drain() {
    let clock = ManualClock::shared();
    let limiter = RateLimiterFactory::create("leaky_bucket", &LimiterParams::new(4.0).with_capacity(8.0), clock.clone()).unwrap();

    assert!(limiter.acquire(8));
    assert!(!limiter.acquire(1));

    clock.advance_secs_f64(1.0 / 4.0);
    assert!(limiter.acquire(1));
}

#[tokio::test(start_paused = true)]
async fn test_wait_honours_timeout_for_every_strategy() {
    let clock = ManualClock::shared();
    let registry = MultiRateLimiter::with_clock(clock);

    for tag in ["token_bucket", "fixed_window", "sliding_window", "leaky_bucket"] {
        registry.add_limiter(tag, tag, &LimiterParams::new(1.0)).unwrap();
        assert!(registry.acquire(tag, 1).unwrap());

        let started = tokio::time::Instant::now();
        assert!(!registry.wait_for_token(tag, 1, Duration::from_millis(250)).await.unwrap());
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(250), "{tag} returned early");
        assert!(waited < Duration::from_millis(400), "{tag} overshot its timeout");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_waiters_share_one_limiter() {
    let limiter: Arc<dyn RateLimiter> = Arc::new(TokenBucket::new(100.0, 5.0).unwrap());

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let limiter = Arc::clone(&limiter);
        tasks.push(tokio::spawn(async move { limiter.wait_for_token(1, Duration::from_secs(3)).await }));
    }

    for task in tasks {
        assert!(task.await.unwrap());
    }
}
