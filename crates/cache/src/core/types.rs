//! Core cache types and structures

use crate::config::CacheConfig;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use super::internal::CacheState;

/// Size- and memory-bounded cache of `V` keyed by namespaced strings.
///
/// Cloning is cheap and every clone shares the same entries and metrics.
pub struct BoundedCache<V> {
    pub(super) inner: Arc<CacheInner<V>>,
}

pub(super) struct CacheInner<V> {
    pub config: CacheConfig,
    pub state: Mutex<CacheState<V>>,
}

impl<V> BoundedCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        let state = CacheState::new(&config);
        Self {
            inner: Arc::new(CacheInner {
                config,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }
}

impl<V> Clone for BoundedCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for BoundedCache<V> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl<V> fmt::Debug for BoundedCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("BoundedCache")
            .field("config", &self.inner.config)
            .field("entry_count", &state.entries.len())
            .field("memory_usage", &state.memory_usage)
            .finish()
    }
}
