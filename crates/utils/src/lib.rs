//! Shared utilities for taskstore
//!
//! This crate holds the pieces the store adapters share that are not cache
//! specific: the per-resource lock manager and tracing setup.

pub mod sync;
pub mod tracing;

pub use sync::{HeldLocks, LockChain, MutexConfig, MutexStats, ResourceGuard, ResourceMutex};
