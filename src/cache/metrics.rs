// Counters for cache activity. Updated under the cache lock, read as a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    // A live entry was reused and touched.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // A fetch was issued.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_invalidations(&mut self, count: usize) {
        self.invalidations += count as u64;
    }

    // Example: "Hits: 10, Misses: 3, Evictions: 2, Invalidations: 0"
    pub fn report(&self) -> String {
        format!(
            "Hits: {}, Misses: {}, Evictions: {}, Invalidations: {}",
            self.hits, self.misses, self.evictions, self.invalidations
        )
    }
}
