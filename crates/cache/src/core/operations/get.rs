//! Lookups and read-through helpers

use crate::entry::SetOptions;
use crate::keys;
use crate::sentinel::Lookup;
use serde::Serialize;
use tokio::time::Instant;
use tracing::trace;

use crate::core::types::BoundedCache;

impl<V: Clone> BoundedCache<V> {
    /// Look up `key`, counting a hit or a miss.
    ///
    /// A hit promotes the entry to most recently used. An expired entry is
    /// dropped and reported as a miss.
    pub fn get(&self, key: &str) -> Lookup<V> {
        let now = Instant::now();
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        match state.entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                if self.inner.config.update_age_on_get {
                    entry.refreshed_at = now;
                }
                state.metrics.record_hit(&entry.namespace);
                trace!(key, "cache hit");
                Lookup::Hit(entry.value.clone())
            }
            Some(_) => {
                let namespace = state
                    .expire(key)
                    .unwrap_or_else(|| keys::namespace_of(key));
                state.metrics.record_miss(&namespace);
                Lookup::Miss
            }
            None => {
                state.metrics.record_miss(&keys::namespace_of(key));
                trace!(key, "cache miss");
                Lookup::Miss
            }
        }
    }

    /// Whether a live entry exists for `key`.
    ///
    /// Neither counts as a lookup nor changes recency.
    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        match state.entries.peek_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                if self.inner.config.update_age_on_has {
                    entry.refreshed_at = now;
                }
                true
            }
            Some(_) => {
                state.expire(key);
                false
            }
            None => false,
        }
    }
}

impl<V: Clone + Serialize> BoundedCache<V> {
    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// `f` runs without the cache lock held, so concurrent callers may both
    /// compute; hold the resource lock for the underlying record when that
    /// matters.
    pub fn get_or_insert_with<F>(&self, key: &str, options: SetOptions, f: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Lookup::Hit(value) = self.get(key) {
            return value;
        }
        let value = f();
        self.set(key, value.clone(), options);
        value
    }

    /// Fallible form of [`get_or_insert_with`](Self::get_or_insert_with).
    /// Errors from `f` are returned and nothing is stored.
    pub fn get_or_try_insert_with<F, E>(&self, key: &str, options: SetOptions, f: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Lookup::Hit(value) = self.get(key) {
            return Ok(value);
        }
        let value = f()?;
        self.set(key, value.clone(), options);
        Ok(value)
    }
}
