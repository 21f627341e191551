//! Cache entries and per-entry options

use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::Instant;

/// Size assumed for values whose serialized form cannot be produced
pub const FALLBACK_ENTRY_SIZE: u64 = 1024;

/// In-memory cache entry
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    /// When the entry was inserted; drives memory-pressure eviction order
    pub inserted_at: Instant,
    /// Insertion order, breaking ties between equal timestamps
    pub sequence: u64,
    /// Start of the current TTL window
    pub refreshed_at: Instant,
    pub namespace: String,
    pub tags: BTreeSet<String>,
    /// Estimated size in bytes
    pub size: u64,
    /// Effective TTL; `None` never expires
    pub ttl: Option<Duration>,
}

impl<V> CacheEntry<V> {
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_duration_since(self.refreshed_at) > ttl,
            None => false,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Sort key for "oldest inserted first"
    pub(crate) fn age_rank(&self) -> (Instant, u64) {
        (self.inserted_at, self.sequence)
    }
}

/// Options for [`BoundedCache::set`](crate::BoundedCache::set)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Overrides the cache's default TTL
    pub ttl: Option<Duration>,
    /// Labels for later invalidation
    pub tags: BTreeSet<String>,
    /// Explicit namespace; otherwise parsed from the key
    pub namespace: Option<String>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn namespace(mut self, namespace: impl AsRef<str>) -> Self {
        self.namespace = Some(namespace.as_ref().to_string());
        self
    }
}

/// Estimate the in-memory footprint of `value` from its JSON encoding.
///
/// Never fails: values that cannot be serialized count as
/// [`FALLBACK_ENTRY_SIZE`] bytes.
pub fn estimate_size<V: Serialize>(value: &V) -> u64 {
    match serde_json::to_vec(value) {
        Ok(bytes) => bytes.len() as u64,
        Err(e) => {
            tracing::debug!(error = %e, fallback = FALLBACK_ENTRY_SIZE, "cannot size cache value, using fallback");
            FALLBACK_ENTRY_SIZE
        }
    }
}
