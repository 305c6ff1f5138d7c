use std::time::Duration;
use std::time::Instant;

use cg_app::Throttle;
use cg_app::ThrottleError;
use cg_app::cli;
use cg_app::config_loader;
use cg_cache::generate_key;
use cg_ratelimit::RateLimiter;
use tracing::info;
use tracing::warn;

const BURST_FACTOR: u32 = 2;
const WAIT_TIMEOUT: Duration = Duration::from_millis(250);
const CACHE_ROUNDS: usize = 3;

/// Fire twice each limiter's capacity in a tight loop and report how many got through
fn probe_burst(throttle: &Throttle) -> Result<(), ThrottleError> {
    for name in throttle.limiters().list_limiters() {
        let limiter = throttle.limiters().get_limiter(&name)?;
        let capacity = limiter.capacity();
        let attempts = if capacity.is_finite() { (capacity as u32).saturating_mul(BURST_FACTOR).max(1) } else { 100 };

        let granted = (0..attempts).filter(|_| limiter.acquire(1)).count();
        info!("{name}: {granted}/{attempts} granted in burst ({})", limiter.kind());
    }
    Ok(())
}

/// Block on one more permit per limiter now that bursts have drained them
async fn probe_wait(throttle: &Throttle) -> Result<(), ThrottleError> {
    for name in throttle.limiters().list_limiters() {
        let started = Instant::now();
        let acquired = throttle.limiters().wait_for_token(&name, 1, WAIT_TIMEOUT).await?;
        info!("{name}: wait_for_token -> {acquired} after {:?}", started.elapsed());
    }
    Ok(())
}

/// Repeat the same simulated generation call; only the first should reach upstream
async fn probe_cache(throttle: &Throttle) -> Result<(), ThrottleError> {
    let Some(limiter) = throttle.limiters().list_limiters().into_iter().next() else {
        warn!("No limiters configured, skipping cache probe");
        return Ok(());
    };
    throttle.limiters().get_limiter(&limiter)?.reset();

    let prompt = "a lighthouse on a cliff at dusk";
    let key = generate_key("image", [prompt, "1024x1024", "seed=42"]);
    let asset_id = &key[key.len() - 8..];

    for round in 0..CACHE_ROUNDS {
        let started = Instant::now();
        let result = throttle
            .call(&limiter, &key, 1, WAIT_TIMEOUT, || async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, ThrottleError>(format!("https://cdn.example/{asset_id}.png"))
            })
            .await;

        match result {
            Ok(url) => info!("round {round}: {url} in {:?}", started.elapsed()),
            Err(err) => warn!("round {round}: {err}"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Keep guard alive for the whole run
    let _guard = cg_app::tracing_setup::init("cg_probe", "./logs", tracing::Level::INFO, true);

    let path = cli::config_path(config_loader::DEFAULT_CONFIG_PATH);
    let config = config_loader::load_or_default(&path);
    let throttle = Throttle::from_config(&config)?;

    info!("Probing {} limiters", throttle.limiters().len());
    probe_burst(&throttle)?;
    probe_wait(&throttle).await?;
    probe_cache(&throttle).await?;

    for (name, snapshot) in throttle.limiters().snapshots() {
        info!("{name}: {}", serde_json::to_string(&snapshot)?);
    }

    let swept = throttle.cache().cleanup_expired();
    info!("Cache stats: {} (swept {swept})", serde_json::to_string(&throttle.cache().stats())?);

    Ok(())
}
