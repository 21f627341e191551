//! Cache remove operations

use crate::invalidation::InvalidationScope;
use tokio::time::Instant;
use tracing::debug;

use crate::core::types::BoundedCache;

impl<V> BoundedCache<V> {
    /// Remove `key`; returns whether an entry was stored under it
    pub fn delete(&self, key: &str) -> bool {
        self.inner.state.lock().detach(key).is_some()
    }

    /// Remove every entry matched by `scope` and return how many went.
    ///
    /// Hit and miss counters are kept, including for `InvalidationScope::all()`.
    pub fn invalidate(&self, scope: &InvalidationScope) -> usize {
        if scope.is_empty() {
            return 0;
        }

        let mut state = self.inner.state.lock();
        let removed = if scope.all {
            state.remove_all()
        } else {
            state.remove_where(|key, entry| scope.matches(key, entry))
        };
        debug!(
            namespace = ?scope.namespace,
            tag = ?scope.tag,
            pattern = ?scope.pattern,
            all = scope.all,
            removed,
            "invalidated cache entries"
        );
        removed
    }

    /// Remove every entry and reset per-namespace metrics
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        let removed = state.remove_all();
        state.metrics.reset_namespaces();
        debug!(removed, "cache cleared");
    }

    /// Drop every expired entry now instead of on next access
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let removed = self
            .inner
            .state
            .lock()
            .remove_where(|_, entry| entry.is_expired(now));
        if removed > 0 {
            debug!(removed, "purged expired cache entries");
        }
        removed
    }
}
