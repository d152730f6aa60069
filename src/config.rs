use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::error::ConfigError;

/// Tuning for an [`ExpiringResourceCache`](crate::ExpiringResourceCache).
///
/// Durations accept humantime strings such as `"5s"` or `"250ms"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// How long an entry stays live after its last access.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// How often the background sweep looks for expired entries.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_millis(5000),
            sweep_interval: Duration::from_millis(1000),
        }
    }
}

impl CacheConfig {
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            ttl,
            sweep_interval,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl.is_zero() {
            return Err(ConfigError::ZeroTtl);
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }
        // Deadlines are `now + duration`; that sum has to be representable.
        let now = Instant::now();
        for (field, value) in [("ttl", self.ttl), ("sweep_interval", self.sweep_interval)] {
            if now.checked_add(value).is_none() {
                return Err(ConfigError::DurationTooLarge { field, value });
            }
        }
        Ok(())
    }

    /// Parses and validates a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: CacheConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading cache config from {:?}", path);
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}
