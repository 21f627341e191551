//! Cache metrics collection and snapshots
//!
//! Counters live inside the cache's state mutex, so they are plain integers.
//! [`CacheMetrics`] is the read-only snapshot handed out to callers.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Point-in-time view of cache behaviour
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, or `0.0` before any lookup
    pub hit_rate: f64,
    /// Live entry count
    pub size: usize,
    /// Entry ceiling (0 = unbounded)
    pub max_size: usize,
    pub evictions: u64,
    /// Sum of estimated entry sizes in bytes
    pub memory_usage: u64,
    pub namespace_metrics: BTreeMap<String, NamespaceMetrics>,
}

/// Per-namespace counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceMetrics {
    pub hits: u64,
    pub misses: u64,
    /// Live entry count in the namespace
    pub size: usize,
    pub evictions: u64,
}

impl NamespaceMetrics {
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }
}

pub(crate) fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Mutable counters owned by the cache state
#[derive(Debug, Default)]
pub(crate) struct MetricsCollector {
    enabled: bool,
    hits: u64,
    misses: u64,
    evictions: u64,
    namespaces: HashMap<String, NamespaceMetrics>,
}

impl MetricsCollector {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn record_hit(&mut self, namespace: &str) {
        if self.enabled {
            self.hits += 1;
            self.namespace_mut(namespace).hits += 1;
        }
    }

    pub fn record_miss(&mut self, namespace: &str) {
        if self.enabled {
            self.misses += 1;
            self.namespace_mut(namespace).misses += 1;
        }
    }

    pub fn record_eviction(&mut self, namespace: &str) {
        if self.enabled {
            self.evictions += 1;
            self.namespace_mut(namespace).evictions += 1;
        }
    }

    /// Forget per-namespace counters; global counters are kept
    pub fn reset_namespaces(&mut self) {
        self.namespaces.clear();
    }

    /// Build a snapshot. `live` yields the namespace of every live entry.
    pub fn snapshot<'a>(
        &self,
        live: impl Iterator<Item = &'a str>,
        max_size: usize,
        memory_usage: u64,
    ) -> CacheMetrics {
        let mut namespace_metrics: BTreeMap<String, NamespaceMetrics> = self
            .namespaces
            .iter()
            .map(|(name, counters)| {
                (
                    name.clone(),
                    NamespaceMetrics {
                        size: 0,
                        ..*counters
                    },
                )
            })
            .collect();

        let mut size = 0;
        for namespace in live {
            size += 1;
            namespace_metrics
                .entry(namespace.to_string())
                .or_default()
                .size += 1;
        }

        CacheMetrics {
            hits: self.hits,
            misses: self.misses,
            hit_rate: hit_rate(self.hits, self.misses),
            size,
            max_size,
            evictions: self.evictions,
            memory_usage,
            namespace_metrics,
        }
    }

    fn namespace_mut(&mut self, namespace: &str) -> &mut NamespaceMetrics {
        self.namespaces.entry(namespace.to_string()).or_default()
    }
}
