//! Cache eviction logic
//!
//! Two ceilings apply on insert. The memory ceiling is enforced first by
//! evicting the oldest inserted entries; the entry ceiling is then enforced
//! by the LRU list itself.

use crate::entry::CacheEntry;
use tracing::debug;

use super::internal::CacheState;

impl<V> CacheState<V> {
    /// Evict oldest-inserted entries until `incoming` more bytes fit under
    /// `max_memory`, or nothing is left to evict.
    pub(crate) fn reclaim_memory(&mut self, incoming: u64, max_memory: u64) -> usize {
        let mut evicted = 0;
        while self.memory_usage + incoming > max_memory {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.age_rank())
                .map(|(key, _)| key.clone());
            let Some(key) = oldest else {
                break;
            };
            if let Some(entry) = self.detach(&key) {
                debug!(
                    key = %key,
                    namespace = %entry.namespace,
                    size = entry.size,
                    memory_usage = self.memory_usage,
                    max_memory,
                    "evicted cache entry under memory pressure"
                );
                self.metrics.record_eviction(&entry.namespace);
                evicted += 1;
            }
        }
        evicted
    }

    /// Insert `entry`, evicting the least recently used entry when the
    /// entry ceiling is reached. `key` must not be present.
    pub(crate) fn insert_bounded(&mut self, key: String, entry: CacheEntry<V>) {
        self.memory_usage += entry.size;
        if let Some((evicted_key, evicted)) = self.entries.push(key, entry) {
            self.memory_usage = self.memory_usage.saturating_sub(evicted.size);
            debug!(
                key = %evicted_key,
                namespace = %evicted.namespace,
                "evicted least recently used cache entry"
            );
            self.metrics.record_eviction(&evicted.namespace);
        }
    }
}
