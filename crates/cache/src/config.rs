//! Cache configuration with environment overrides and validation

use serde::{Deserialize, Serialize};
use std::time::Duration;
use taskstore_core::{
    env_flag, env_override, Result, CACHE_MAX_ENTRIES_VAR, CACHE_MAX_MEMORY_VAR,
    CACHE_METRICS_VAR, CACHE_TTL_MS_VAR, DEFAULT_CACHE_MAX_ENTRIES,
};

/// Configuration for [`BoundedCache`](crate::BoundedCache), fixed for the
/// lifetime of an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Entry-count ceiling enforced with LRU eviction (0 = unbounded)
    pub max_entries: usize,
    /// Default time-to-live for entries without their own
    #[serde(with = "taskstore_core::serde_helpers::option_duration_ms")]
    pub ttl: Option<Duration>,
    /// Restart an entry's TTL when `get` returns it
    pub update_age_on_get: bool,
    /// Restart an entry's TTL when `has` sees it
    pub update_age_on_has: bool,
    /// Memory ceiling in estimated bytes (0 = unlimited)
    pub max_memory: u64,
    /// Track hit/miss/eviction counters
    pub enable_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            ttl: None,
            update_age_on_get: false,
            update_age_on_has: false,
            max_memory: 0,
            enable_metrics: true,
        }
    }
}

impl CacheConfig {
    /// Defaults overridden by `TASKSTORE_CACHE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `TASKSTORE_CACHE_*` environment variables on top of `self`
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(max_entries) = env_override::<usize>(CACHE_MAX_ENTRIES_VAR)? {
            self.max_entries = max_entries;
        }
        if let Some(ms) = env_override::<u64>(CACHE_TTL_MS_VAR)? {
            self.ttl = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(max_memory) = env_override::<u64>(CACHE_MAX_MEMORY_VAR)? {
            self.max_memory = max_memory;
        }
        if let Some(enabled) = env_flag(CACHE_METRICS_VAR)? {
            self.enable_metrics = enabled;
        }
        Ok(self)
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_max_memory(mut self, max_memory: u64) -> Self {
        self.max_memory = max_memory;
        self
    }

    pub fn with_update_age_on_get(mut self, enabled: bool) -> Self {
        self.update_age_on_get = enabled;
        self
    }

    pub fn with_update_age_on_has(mut self, enabled: bool) -> Self {
        self.update_age_on_has = enabled;
        self
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.enable_metrics = enabled;
        self
    }
}
