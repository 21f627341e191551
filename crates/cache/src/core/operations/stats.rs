//! Cache statistics and inspection

use crate::metrics::CacheMetrics;

use crate::core::types::BoundedCache;

impl<V> BoundedCache<V> {
    /// Snapshot of counters, sizes and per-namespace figures
    pub fn metrics(&self) -> CacheMetrics {
        let state = self.inner.state.lock();
        state.metrics.snapshot(
            state.entries.iter().map(|(_, entry)| entry.namespace.as_str()),
            self.inner.config.max_entries,
            state.memory_usage,
        )
    }

    /// Estimated bytes held by stored entries
    pub fn estimate_memory(&self) -> u64 {
        self.inner.state.lock().memory_usage
    }

    /// Number of stored entries, counting expired ones not yet dropped
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored keys, most recently used first
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .entries
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Stored keys whose entry belongs to `namespace`, most recently used
    /// first.
    ///
    /// Matches on the entry's namespace, like
    /// [`InvalidationScope::namespace`](crate::InvalidationScope::namespace),
    /// so an entry stored with an explicit namespace is listed under that
    /// namespace and not under its key prefix. Use
    /// [`keys::keys_in_namespace`](crate::keys::keys_in_namespace) to filter
    /// by prefix.
    pub fn keys_in_namespace(&self, namespace: impl AsRef<str>) -> Vec<String> {
        let namespace = namespace.as_ref();
        self.inner
            .state
            .lock()
            .entries
            .iter()
            .filter(|(_, entry)| entry.namespace == namespace)
            .map(|(key, _)| key.clone())
            .collect()
    }
}
