use std::time::Duration;

use tokio::time::Instant;

use crate::resource::AsyncResource;

pub struct CacheEntry<T, E> {
    pub resource: AsyncResource<T, E>,
    // None when `now + ttl` is past what an Instant can hold; such an entry never expires.
    pub expires_at: Option<Instant>,
}

impl<T, E> CacheEntry<T, E> {
    pub fn new(resource: AsyncResource<T, E>, ttl: Duration, now: Instant) -> Self {
        Self {
            resource,
            expires_at: now.checked_add(ttl),
        }
    }

    /// An entry whose deadline has been reached is no longer live.
    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if deadline <= now)
    }

    /// Slides the deadline forward from `now`.
    pub fn touch(&mut self, ttl: Duration, now: Instant) {
        self.expires_at = now.checked_add(ttl);
    }
}
