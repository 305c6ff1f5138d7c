use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use cg_clock::SharedClock;
use cg_clock::SystemClock;
use cg_clock::duration_to_nanos;
use lru::LruCache;
use parking_lot::Mutex;
use rapidhash::RapidHashMap;
use tokio::sync::watch;

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::error::Result;
use crate::stats::AtomicStats;
use crate::stats::CacheStats;

struct CacheEntry<V> {
    value: V,
    created_at: u64,
    /// Zero means the entry never expires
    ttl_nanos: u64,
}

impl<V> CacheEntry<V> {
    #[inline]
    fn is_expired(&self, now: u64) -> bool {
        self.ttl_nanos > 0 && now.saturating_sub(self.created_at) > self.ttl_nanos
    }
}

/// Outcome of an in-flight computation as seen by its followers
#[derive(Clone)]
enum FlightState<V> {
    Pending,
    Ready(V),
    Failed,
}

enum Flight<V> {
    /// The value landed in the store while we were queueing for the lock
    Cached(V),
    Follow(watch::Receiver<FlightState<V>>),
    Lead(watch::Sender<FlightState<V>>),
}

type InFlight<V> = Mutex<RapidHashMap<String, watch::Receiver<FlightState<V>>>>;

/// Clears the in-flight marker however the leader exits, including errors,
/// panics and the leader's future being dropped
struct FlightGuard<'a, V> {
    in_flight: &'a InFlight<V>,
    key: &'a str,
}

impl<V> Drop for FlightGuard<'_, V> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(self.key);
    }
}

/// Bounded in-memory cache with per-entry TTL and LRU eviction
///
/// Reads and writes both refresh recency. When a new key arrives at capacity
/// the least recently used entry is evicted first. Expired entries are never
/// returned, even before [`CacheManager::cleanup_expired`] sweeps them.
///
/// [`CacheManager::get_or_compute`] runs at most one producer per key at a
/// time; concurrent callers for the same key wait for that result.
pub struct CacheManager<V> {
    store: Mutex<LruCache<String, CacheEntry<V>>>,
    in_flight: InFlight<V>,
    stats: AtomicStats,
    max_size: NonZeroUsize,
    default_ttl: Duration,
    enabled: bool,
    clock: SharedClock,
}

impl<V> CacheManager<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache on the system clock
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create a cache that reads time from `clock`
    pub fn with_clock(config: CacheConfig, clock: SharedClock) -> Result<Self> {
        let max_size = NonZeroUsize::new(config.max_size).ok_or_else(|| CacheError::InvalidConfig("max_size must be greater than 0".to_string()))?;
        let default_ttl = config.default_ttl()?;

        if config.enabled {
            tracing::debug!(max_size = max_size.get(), default_ttl_secs = default_ttl.as_secs_f64(), "cache created");
        } else {
            tracing::warn!("cache disabled, every lookup will miss");
        }

        Ok(Self {
            // Capacity is enforced in `set_with_ttl` so evictions can be counted
            store: Mutex::new(LruCache::unbounded()),
            in_flight: Mutex::new(RapidHashMap::default()),
            stats: AtomicStats::default(),
            max_size,
            default_ttl,
            enabled: config.enabled,
            clock,
        })
    }

    /// Insert or overwrite `key` with the default TTL
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert or overwrite `key`. A zero `ttl` never expires.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        if !self.enabled {
            return;
        }

        let key = key.into();
        let entry = CacheEntry { value, created_at: self.clock.now_nanos(), ttl_nanos: duration_to_nanos(ttl) };

        let mut store = self.store.lock();
        if !store.contains(&key) && store.len() >= self.max_size.get() {
            if let Some((evicted, _)) = store.pop_lru() {
                self.stats.evicted(1);
                tracing::debug!(key = %evicted, "evicted least recently used entry");
            }
        }
        store.put(key, entry);
    }

    /// Cached value for `key`, counting a hit or a miss
    pub fn get(&self, key: &str) -> Option<V> {
        if !self.enabled {
            return None;
        }
        self.lookup(key, true)
    }

    /// Whether a live entry exists. Does not touch recency or counters.
    pub fn exists(&self, key: &str) -> bool {
        if !self.enabled {
            return false;
        }

        let now = self.clock.now_nanos();
        self.store.lock().peek(key).is_some_and(|entry| !entry.is_expired(now))
    }

    /// Remove `key`. Returns whether an entry was present.
    pub fn delete(&self, key: &str) -> bool {
        self.store.lock().pop(key).is_some()
    }

    /// Remove every entry. Counters are kept.
    pub fn clear(&self) {
        self.store.lock().clear();
    }

    /// Cached value for `key`, or the result of `producer` which is then stored
    ///
    /// Only one producer runs per key at a time. Callers arriving while it
    /// runs wait for its value instead of starting their own. A producer
    /// error is returned as is and nothing is cached; waiting callers then
    /// retry, one of them becoming the new producer.
    ///
    /// A disabled cache calls `producer` every time.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, producer: F) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        if !self.enabled {
            return producer().await;
        }

        let leader = loop {
            if let Some(value) = self.get(key) {
                return Ok(value);
            }

            match self.join_flight(key) {
                Flight::Cached(value) => return Ok(value),
                Flight::Lead(sender) => break sender,
                Flight::Follow(receiver) => {
                    if let Some(value) = Self::follow(receiver).await {
                        return Ok(value);
                    }
                    tracing::debug!(key, "in-flight computation did not produce a value, retrying");
                }
            }
        };

        let _guard = FlightGuard { in_flight: &self.in_flight, key };

        match producer().await {
            Ok(value) => {
                self.set(key, value.clone());
                leader.send_replace(FlightState::Ready(value.clone()));
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(key, "cache producer failed, result not cached");
                leader.send_replace(FlightState::Failed);
                Err(err)
            }
        }
    }

    /// Physically remove every expired entry, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now_nanos();
        let mut store = self.store.lock();

        let expired: Vec<String> = store.iter().filter(|(_, entry)| entry.is_expired(now)).map(|(key, _)| key.clone()).collect();
        for key in &expired {
            store.pop(key);
        }

        let removed = expired.len();
        if removed > 0 {
            self.stats.evicted(removed as u64);
            tracing::debug!(removed, remaining = store.len(), "swept expired cache entries");
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let size = self.store.lock().len();
        self.stats.to_stats(size, self.max_size.get())
    }

    /// Entries physically held, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Fetch a live entry, refreshing its recency
    ///
    /// An expired entry found on the way is removed and counted as evicted.
    fn lookup(&self, key: &str, record: bool) -> Option<V> {
        let now = self.clock.now_nanos();
        let mut store = self.store.lock();

        let found = store.get(key).map(|entry| (!entry.is_expired(now)).then(|| entry.value.clone()));
        match found {
            Some(Some(value)) => {
                if record {
                    self.stats.hit();
                }
                Some(value)
            }
            Some(None) => {
                store.pop(key);
                self.stats.evicted(1);
                if record {
                    self.stats.miss();
                }
                None
            }
            None => {
                if record {
                    self.stats.miss();
                }
                None
            }
        }
    }

    /// Join the running computation for `key` or register as its leader
    fn join_flight(&self, key: &str) -> Flight<V> {
        let mut in_flight = self.in_flight.lock();

        if let Some(receiver) = in_flight.get(key) {
            return Flight::Follow(receiver.clone());
        }

        // A previous leader may have stored its value and left after our lookup
        if let Some(value) = self.lookup(key, false) {
            return Flight::Cached(value);
        }

        let (sender, receiver) = watch::channel(FlightState::Pending);
        in_flight.insert(key.to_string(), receiver);
        Flight::Lead(sender)
    }

    /// Wait for the leader's outcome. `None` when it failed or went away.
    async fn follow(mut receiver: watch::Receiver<FlightState<V>>) -> Option<V> {
        let state = receiver.wait_for(|state| !matches!(state, FlightState::Pending)).await.ok()?;
        match &*state {
            FlightState::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }
}
