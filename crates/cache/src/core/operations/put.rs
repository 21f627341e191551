//! Cache put operations

use crate::entry::{estimate_size, CacheEntry, SetOptions};
use crate::keys;
use serde::Serialize;
use tokio::time::Instant;
use tracing::trace;

use crate::core::types::BoundedCache;

impl<V: Serialize> BoundedCache<V> {
    /// Store `value` under `key`, replacing any previous entry.
    ///
    /// The namespace comes from `options`, else from the key, else
    /// [`UNKNOWN_NAMESPACE`](crate::keys::UNKNOWN_NAMESPACE). Storing never
    /// fails; making room may evict other entries.
    pub fn set(&self, key: impl Into<String>, value: V, options: SetOptions) {
        let key = key.into();
        let size = estimate_size(&value);
        let namespace = options
            .namespace
            .unwrap_or_else(|| keys::namespace_of(&key));
        let ttl = options.ttl.or(self.inner.config.ttl);
        let max_memory = self.inner.config.max_memory;
        let now = Instant::now();

        let mut state = self.inner.state.lock();
        // Replacement is not an eviction
        state.detach(&key);
        if max_memory > 0 {
            state.reclaim_memory(size, max_memory);
        }

        trace!(key = %key, namespace = %namespace, size, "cache set");
        let entry = CacheEntry {
            value,
            inserted_at: now,
            sequence: state.next_sequence(),
            refreshed_at: now,
            namespace,
            tags: options.tags,
            size,
            ttl,
        };
        state.insert_bounded(key, entry);
    }
}
