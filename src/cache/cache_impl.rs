use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use super::entry::CacheEntry;
use super::key::validate_key;
use super::metrics::CacheMetrics;
use super::sweep::SweepTask;
use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::resource::AsyncResource;

type FetchFn<T, E> = Box<dyn Fn(String) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

struct Store<T, E> {
    entries: HashMap<String, CacheEntry<T, E>>,
    metrics: CacheMetrics,
}

// State reachable from both the cache handle and the sweep task.
struct Shared<T, E> {
    store: Mutex<Store<T, E>>,
    fetch: FetchFn<T, E>,
    config: CacheConfig,
    runtime: Handle,
}

impl<T, E> Shared<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn get_or_create(&self, key: &str, now: Instant) -> AsyncResource<T, E> {
        let ttl = self.config.ttl;
        let mut guard = self.store.lock();
        let Store { entries, metrics } = &mut *guard;

        if let Some(entry) = entries.get_mut(key) {
            if !entry.is_expired(now) {
                entry.touch(ttl, now);
                metrics.record_hit();
                trace!(key, resource = %entry.resource.id(), "Cache hit");
                return entry.resource.clone();
            }
        }

        // Expired but not swept yet: treat it as absent and fetch again, rather than
        // reviving the stale resource until the next sweep.
        if entries.remove(key).is_some() {
            metrics.record_evictions(1);
            debug!(key, "Evicted expired entry on access");
        }

        // Stored before the fetch settles so later callers share the in-flight resource.
        let operation = (self.fetch)(key.to_string());
        let resource = AsyncResource::spawn_on(&self.runtime, operation);
        metrics.record_miss();
        debug!(key, resource = %resource.id(), "Cache miss, fetch issued");
        entries.insert(key.to_string(), CacheEntry::new(resource.clone(), ttl, now));
        resource
    }

    fn sweep(&self, now: Instant) -> usize {
        let mut store = self.store.lock();
        let expired: Vec<String> = store
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            store.entries.remove(key);
            trace!(key = key.as_str(), "Swept expired entry");
        }
        store.metrics.record_evictions(expired.len());

        if !expired.is_empty() {
            debug!(
                evicted = expired.len(),
                remaining = store.entries.len(),
                "Sweep finished"
            );
        }
        expired.len()
    }
}

/// A keyed store of [`AsyncResource`]s with sliding expiration.
///
/// Each key maps to at most one live resource. Every
/// [`get_or_create`](Self::get_or_create) on a live key pushes its deadline to
/// `now + ttl`; a background task evicts entries whose deadline has passed.
/// Eviction only drops the cache's handle: resources already handed out stay
/// readable, and their operations run to completion.
///
/// The fetch function is invoked while the cache is locked and must not call
/// back into the same cache synchronously. Its returned future may.
pub struct ExpiringResourceCache<T, E> {
    shared: Arc<Shared<T, E>>,
    sweeper: Mutex<Option<SweepTask>>,
}

impl<T, E> ExpiringResourceCache<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Creates the cache and starts its sweep task on the current tokio runtime.
    pub fn new<F, Fut>(config: CacheConfig, fetch: F) -> Result<Self, CacheError>
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;

        let shared = Arc::new(Shared {
            store: Mutex::new(Store {
                entries: HashMap::new(),
                metrics: CacheMetrics::new(),
            }),
            fetch: Box::new(move |key| fetch(key).boxed()),
            config,
            runtime: runtime.clone(),
        });

        let weak = Arc::downgrade(&shared);
        let sweeper = SweepTask::start(&runtime, config.sweep_interval, move || {
            match weak.upgrade() {
                Some(shared) => {
                    shared.sweep(Instant::now());
                    true
                }
                None => false,
            }
        });

        info!(
            ttl = ?config.ttl,
            sweep_interval = ?config.sweep_interval,
            "Expiring resource cache started"
        );

        Ok(Self {
            shared,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    pub fn with_defaults<F, Fut>(fetch: F) -> Result<Self, CacheError>
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::new(CacheConfig::default(), fetch)
    }

    // Returns the live resource for `key`, or fetches a new one.
    // Either way the entry's deadline becomes `now + ttl`.
    // Example:
    // let first = cache.get_or_create("pikachu")?;
    // let again = cache.get_or_create("pikachu")?;
    // `again.ptr_eq(&first)` holds while the entry is live, and only one fetch was issued.
    pub fn get_or_create(&self, key: &str) -> Result<AsyncResource<T, E>, CacheError> {
        validate_key(key)?;
        Ok(self.shared.get_or_create(key, Instant::now()))
    }

    // Evicts every entry whose deadline has been reached and returns how many were removed.
    // Example:
    // let evicted = cache.sweep();
    // Handles returned before the sweep keep reading their settled value.
    pub fn sweep(&self) -> usize {
        self.shared.sweep(Instant::now())
    }
}

impl<T, E> ExpiringResourceCache<T, E> {
    // Drops the entry for `key` so the next request fetches again.
    // Example:
    // cache.invalidate("missingno"); // after a failed lookup
    // let retry = cache.get_or_create("missingno")?; // issues a fresh fetch
    pub fn invalidate(&self, key: &str) -> bool {
        let mut store = self.shared.store.lock();
        let removed = store.entries.remove(key).is_some();
        if removed {
            store.metrics.record_invalidations(1);
            debug!(key, "Invalidated entry");
        }
        removed
    }

    pub fn clear(&self) -> usize {
        let mut store = self.shared.store.lock();
        let count = store.entries.len();
        store.entries.clear();
        store.metrics.record_invalidations(count);
        debug!(count, "Cleared cache");
        count
    }

    /// Number of entries in the mapping, including expired ones not swept yet.
    pub fn len(&self) -> usize {
        self.shared.store.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.store.lock().entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.shared.store.lock().entries.contains_key(key)
    }

    pub fn expires_at(&self, key: &str) -> Option<Instant> {
        self.shared
            .store
            .lock()
            .entries
            .get(key)
            .and_then(|entry| entry.expires_at)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.shared.store.lock().metrics
    }

    // Example: "Hits: 10, Misses: 3, Evictions: 2, Invalidations: 0"
    pub fn report_metrics(&self) -> String {
        self.metrics().report()
    }

    /// Stops the sweep task and waits for it to exit.
    ///
    /// The cache keeps serving requests afterwards; expired entries are then only
    /// dropped when requested again or by an explicit [`sweep`](Self::sweep).
    pub async fn shutdown(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
            info!("Expiring resource cache sweep stopped");
        }
    }
}

impl<T, E> fmt::Debug for ExpiringResourceCache<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringResourceCache")
            .field("config", &self.shared.config)
            .field("entries", &self.len())
            .field("sweeping", &self.sweeper.lock().is_some())
            .finish()
    }
}
