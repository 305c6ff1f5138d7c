use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::error::CacheError;
use crate::error::Result;

/// Cache sizing and expiry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries held at once
    pub max_size: usize,

    /// TTL applied by `set` and `get_or_compute`. Zero means entries never expire.
    pub default_ttl_secs: f64,

    /// A disabled cache stores nothing and always misses
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_size: 1000, default_ttl_secs: 3600.0, enabled: true }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_secs = ttl.as_secs_f64();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Default TTL, rejecting negative and non-finite values
    pub fn default_ttl(&self) -> Result<Duration> {
        let secs = self.default_ttl_secs;
        if !secs.is_finite() || secs < 0.0 {
            return Err(CacheError::InvalidConfig(format!("default_ttl_secs must be a finite number >= 0, got {secs}")));
        }
        Duration::try_from_secs_f64(secs)
            .ok()
            .filter(|ttl| cg_clock::checked_duration_to_nanos(*ttl).is_some())
            .ok_or_else(|| CacheError::InvalidConfig(format!("default_ttl_secs {secs} out of range")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_size, 1000);
        assert_eq!(config.default_ttl().unwrap(), Duration::from_secs(3600));
        assert!(config.enabled);
    }

    #[test]
    fn test_builder() {
        let config = CacheConfig::new().with_max_size(3).with_ttl(Duration::from_millis(1500)).with_enabled(false);
        assert_eq!(config.max_size, 3);
        assert_eq!(config.default_ttl_secs, 1.5);
        assert!(!config.enabled);
    }

    #[test]
    fn test_invalid_ttl() {
        let config = CacheConfig { default_ttl_secs: -1.0, ..Default::default() };
        assert!(matches!(config.default_ttl(), Err(CacheError::InvalidConfig(_))));

        let config = CacheConfig { default_ttl_secs: f64::NAN, ..Default::default() };
        assert!(config.default_ttl().is_err());

        // Beyond what the nanosecond clock can represent
        let config = CacheConfig { default_ttl_secs: 2.0e10, ..Default::default() };
        assert!(matches!(config.default_ttl(), Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: CacheConfig = serde_json::from_str(r#"{"max_size": 50}"#).unwrap();
        assert_eq!(config.max_size, 50);
        assert_eq!(config.default_ttl_secs, 3600.0);
        assert!(config.enabled);
    }
}
