use std::collections::BTreeMap;
use std::path::Path;

use cg_cache::CacheConfig;
use cg_ratelimit::LimiterConfig;
use config::Config;
use config::ConfigError;
use config::File;
use config::FileFormat;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/throttle.example.toml";

/// Named limiters plus the response cache settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThrottleConfigFile {
    #[serde(default)]
    pub limiters: BTreeMap<String, LimiterConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ThrottleConfigFile, ConfigError> {
    let config = Config::builder().add_source(File::from(path.as_ref())).build()?;

    config.try_deserialize()
}

/// Parse TOML text directly, used for embedded or generated configs
pub fn parse_config(toml: &str) -> Result<ThrottleConfigFile, ConfigError> {
    let config = Config::builder().add_source(File::from_str(toml, FileFormat::Toml)).build()?;

    config.try_deserialize()
}

/// Load config with fallback to no limiters and a default cache
pub fn load_or_default(path: &str) -> ThrottleConfigFile {
    match load_config(path) {
        Ok(config) => {
            tracing::info!("Loaded throttle config from {path} ({} limiters)", config.limiters.len());
            config
        }
        Err(err) => {
            tracing::warn!("Failed to load throttle config from {}: {}. Using defaults.", path, err);
            ThrottleConfigFile::default()
        }
    }
}
