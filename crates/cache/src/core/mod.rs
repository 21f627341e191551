//! Bounded in-memory cache
//!
//! [`BoundedCache`] holds at most `max_entries` entries (least recently used
//! go first) and, when `max_memory` is set, at most that many estimated bytes
//! (oldest inserted go first). Entries may carry a TTL, a namespace and tags.
//! Expired entries are dropped lazily when touched, or eagerly through
//! [`BoundedCache::purge_expired`].
//!
//! All operations are synchronous and take one short internal lock, so the
//! cache is safe to share between tasks and threads by cloning it.

mod eviction;
mod internal;
mod operations;
mod types;

pub use types::BoundedCache;
