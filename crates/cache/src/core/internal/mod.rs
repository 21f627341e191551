//! State guarded by the cache mutex

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::metrics::MetricsCollector;
use lru::LruCache;
use std::num::NonZeroUsize;
use tracing::trace;

pub(crate) struct CacheState<V> {
    /// Entries in recency order; `max_entries == 0` makes this unbounded
    pub entries: LruCache<String, CacheEntry<V>>,
    /// Sum of `size` over `entries`
    pub memory_usage: u64,
    pub metrics: MetricsCollector,
    next_sequence: u64,
}

impl<V> CacheState<V> {
    pub fn new(config: &CacheConfig) -> Self {
        let entries = match NonZeroUsize::new(config.max_entries) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries,
            memory_usage: 0,
            metrics: MetricsCollector::new(config.enable_metrics),
            next_sequence: 0,
        }
    }

    pub fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    /// Remove `key` without touching any counter
    pub fn detach(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.pop(key)?;
        self.memory_usage = self.memory_usage.saturating_sub(entry.size);
        Some(entry)
    }

    /// Drop an entry found expired; returns its namespace
    pub fn expire(&mut self, key: &str) -> Option<String> {
        let entry = self.detach(key)?;
        trace!(key, namespace = %entry.namespace, "cache entry expired");
        Some(entry.namespace)
    }

    /// Remove every entry matching `predicate`, returning how many went
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&str, &CacheEntry<V>) -> bool,
    {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, entry)| predicate(key, entry))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            self.detach(key);
        }
        doomed.len()
    }

    pub fn remove_all(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.memory_usage = 0;
        removed
    }
}
