//! Caching layer for taskstore
//!
//! This crate provides the read-side cache used by the file-backed store:
//! - [`BoundedCache`]: LRU entry ceiling, optional memory ceiling, per-entry TTL
//! - Namespaced keys (`namespace:identifier[:tag]`) in [`keys`]
//! - Bulk invalidation by namespace, tag or key pattern
//! - Hit/miss/eviction metrics, overall and per namespace
//!
//! Lookups return [`Lookup`], so a stored `None`, `0` or `""` is never
//! mistaken for a miss.

pub mod config;
pub mod core;
pub mod entry;
pub mod invalidation;
pub mod keys;
pub mod metrics;
pub mod sentinel;

pub use config::CacheConfig;
pub use core::BoundedCache;
pub use entry::{estimate_size, CacheEntry, SetOptions, FALLBACK_ENTRY_SIZE};
pub use invalidation::InvalidationScope;
pub use keys::{CacheKey, CacheNamespace};
pub use metrics::{CacheMetrics, NamespaceMetrics};
pub use sentinel::Lookup;
