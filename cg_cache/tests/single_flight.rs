use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use cg_cache::CacheConfig;
use cg_cache::CacheManager;
use cg_cache::generate_key;
use cg_clock::ManualClock;

fn shared_cache(max_size: usize) -> Arc<CacheManager<String>> {
    Arc::new(CacheManager::new(CacheConfig::new().with_max_size(max_size)).unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_computation() {
    let cache = shared_cache(100);
    let calls = Arc::new(AtomicUsize::new(0));
    let key = generate_key("image", ["a lighthouse at dusk", "1024x1024"]);

    let mut handles = Vec::new();
    for _ in 0..32 {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            cache
                .get_or_compute(&key, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, String>("https://cdn/img/1.png".to_string())
                })
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "https://cdn/img/1.png");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_keys_compute_independently() {
    let cache = shared_cache(100);
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for i in 0..8 {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        handles.push(tokio::spawn(async move {
            let key = format!("text:{i}");
            cache
                .get_or_compute(&key, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok::<_, String>(format!("completion {i}"))
                })
                .await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap().unwrap(), format!("completion {i}"));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 8);
}

#[tokio::test(start_paused = true)]
async fn test_follower_retries_after_leader_failure() {
    let cache = shared_cache(10);
    let calls = Arc::new(AtomicUsize::new(0));

    let leader = {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        tokio::spawn(async move {
            cache
                .get_or_compute("k", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Err::<String, _>("provider timeout".to_string())
                })
                .await
        })
    };

    // Let the leader register before the follower arrives
    tokio::time::sleep(Duration::from_millis(10)).await;

    let follower = {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        tokio::spawn(async move {
            cache
                .get_or_compute("k", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>("second attempt".to_string())
                })
                .await
        })
    };

    assert_eq!(leader.await.unwrap().unwrap_err(), "provider timeout");
    assert_eq!(follower.await.unwrap().unwrap(), "second attempt");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.get("k"), Some("second attempt".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_leader_releases_key() {
    let cache = shared_cache(10);

    let stalled = cache.get_or_compute("k", || async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok::<_, String>("never".to_string())
    });
    let timed_out = tokio::time::timeout(Duration::from_millis(100), stalled).await;
    assert!(timed_out.is_err());

    let value = cache.get_or_compute("k", || async { Ok::<_, String>("after cancel".to_string()) }).await.unwrap();
    assert_eq!(value, "after cancel");
}

#[test]
fn test_capacity_and_expiry_together() {
    let clock = ManualClock::shared();
    let config = CacheConfig::new().with_max_size(3).with_ttl(Duration::from_secs(60));
    let cache: CacheManager<String> = CacheManager::with_clock(config, clock.clone()).unwrap();

    for key in ["k1", "k2", "k3", "k4"] {
        cache.set(key, key.to_uppercase());
    }

    assert_eq!(cache.get("k1"), None);
    assert_eq!(cache.get("k4"), Some("K4".to_string()));

    clock.advance(Duration::from_secs(61));
    assert_eq!(cache.get("k2"), None);
    assert_eq!(cache.cleanup_expired(), 2);

    let stats = cache.stats();
    assert_eq!(stats.size, 0);
    assert_eq!(stats.max_size, 3);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.evictions, 4);
}
