//! Pollable async resources and a keyed cache that hands them out.
//!
//! [`AsyncResource`] wraps one in-flight operation and reports pending,
//! resolved or rejected state through a synchronous [`read`](AsyncResource::read).
//! [`ExpiringResourceCache`] de-duplicates those resources per key, slides each
//! key's expiration forward on every access, and sweeps expired keys on a timer.

pub mod cache;
pub mod config;
pub mod error;
pub mod resource;

pub use cache::{CacheMetrics, ExpiringResourceCache};
pub use config::CacheConfig;
pub use error::{CacheError, ConfigError};
pub use resource::{AsyncResource, ReadError, ResourceId, ResourceState};

#[cfg(test)]
#[path = "unit_test.rs"]
pub mod unit_test;
