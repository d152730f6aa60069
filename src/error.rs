use std::path::PathBuf;
use std::time::Duration;

/// Errors returned by [`ExpiringResourceCache`](crate::ExpiringResourceCache) operations.
///
/// Fetch failures are not represented here: they are stored inside the
/// resource and surface through [`ReadError::Failed`](crate::ReadError::Failed).
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("invalid cache key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },
    #[error("no tokio runtime available to drive fetches and sweeps")]
    NoRuntime,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ttl must be greater than zero")]
    ZeroTtl,
    #[error("sweep interval must be greater than zero")]
    ZeroSweepInterval,
    #[error("{field} of {value:?} is too large to schedule")]
    DurationTooLarge {
        field: &'static str,
        value: Duration,
    },
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
