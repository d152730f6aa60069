mod cache_impl;
pub(crate) mod entry;
mod key;
mod metrics;
mod sweep;

pub use cache_impl::ExpiringResourceCache;
pub use key::validate_key;
pub use metrics::CacheMetrics;
pub use sweep::SweepTask;
