use std::path::Path;

use cg_app::Throttle;
use cg_app::config_loader;

fn example_throttle() -> Throttle {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join(config_loader::DEFAULT_CONFIG_PATH);
    let config = config_loader::load_config(path).unwrap();
    Throttle::from_config(&config).unwrap()
}

#[test]
fn test_example_registers_every_limiter() {
    let throttle = example_throttle();
    assert_eq!(throttle.limiters().list_limiters(), vec!["local_gpu", "moderation", "openai", "replicate", "stability"]);
}

#[test]
fn test_example_strategies() {
    let throttle = example_throttle();
    let kinds: Vec<(String, &str)> = throttle.limiters().snapshots().into_iter().map(|(name, snapshot)| (name, snapshot.strategy)).collect();

    assert!(kinds.contains(&("openai".to_string(), "token_bucket")));
    assert!(kinds.contains(&("stability".to_string(), "fixed_window")));
    assert!(kinds.contains(&("replicate".to_string(), "sliding_window")));
    assert!(kinds.contains(&("local_gpu".to_string(), "leaky_bucket")));
    assert!(kinds.contains(&("moderation".to_string(), "unlimited")));
}

#[test]
fn test_example_cache() {
    let throttle = example_throttle();
    let stats = throttle.cache().stats();

    assert!(throttle.cache().is_enabled());
    assert_eq!(stats.max_size, 1000);
    assert_eq!(stats.size, 0);
}

#[test]
fn test_disabled_limiter_never_throttles() {
    let throttle = example_throttle();
    for _ in 0..10_000 {
        assert!(throttle.limiters().acquire("moderation", 1).unwrap());
    }
}
