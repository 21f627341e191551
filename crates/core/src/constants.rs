//! Constants used throughout the taskstore workspace

use std::time::Duration;

// Lock manager defaults
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_ALLOW_REENTRANCY: bool = true;

// Cache defaults
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;

// Environment variable names
pub const TASKSTORE_LOG_VAR: &str = "TASKSTORE_LOG";
pub const LOCK_TIMEOUT_MS_VAR: &str = "TASKSTORE_LOCK_TIMEOUT_MS";
pub const LOCK_REENTRANT_VAR: &str = "TASKSTORE_LOCK_REENTRANT";
pub const CACHE_MAX_ENTRIES_VAR: &str = "TASKSTORE_CACHE_MAX_ENTRIES";
pub const CACHE_TTL_MS_VAR: &str = "TASKSTORE_CACHE_TTL_MS";
pub const CACHE_MAX_MEMORY_VAR: &str = "TASKSTORE_CACHE_MAX_MEMORY";
pub const CACHE_METRICS_VAR: &str = "TASKSTORE_CACHE_METRICS";
