//! Execution-scoped record of the locks a call chain holds.
//!
//! Reentrancy is decided by asking "does the code running right now hold this
//! lock?", never by looking at the lock table. The answer lives in a tokio
//! task-local set of held leases. A scope only grows for code running
//! *inside* a lock: [`ResourceMutex::with_lock`] and [`ResourceGuard::scope`]
//! run their body with the parent's set plus the lock just taken. Sibling
//! futures in one scope therefore never see each other's locks, and a spawned
//! task starts with an empty set unless handed one through
//! [`LockChain::scope_with`].
//!
//! [`ResourceMutex::with_lock`]: super::ResourceMutex::with_lock
//! [`ResourceGuard::scope`]: super::ResourceGuard::scope

use std::future::Future;
use std::sync::Arc;

tokio::task_local! {
    static HELD: HeldLocks;
}

/// One lease held by the current chain
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeldLock {
    /// Owning lock manager; keys are only unique per manager
    mutex: u64,
    key: String,
    lease: u64,
}

/// Immutable snapshot of the leases held by a call chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeldLocks {
    locks: Arc<Vec<HeldLock>>,
}

impl HeldLocks {
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Whether this chain holds `key` on any lock manager
    pub fn holds(&self, key: &str) -> bool {
        self.locks.iter().any(|held| held.key == key)
    }

    pub(crate) fn lease_for(&self, mutex: u64, key: &str) -> Option<u64> {
        self.locks
            .iter()
            .find(|held| held.mutex == mutex && held.key == key)
            .map(|held| held.lease)
    }

    /// A copy of `self` that also holds `lease` on `key`
    pub(crate) fn with(&self, mutex: u64, key: &str, lease: u64) -> Self {
        let mut locks: Vec<HeldLock> = self
            .locks
            .iter()
            .filter(|held| !(held.mutex == mutex && held.key == key))
            .cloned()
            .collect();
        locks.push(HeldLock {
            mutex,
            key: key.to_string(),
            lease,
        });
        Self {
            locks: Arc::new(locks),
        }
    }
}

/// Entry point for the current chain's lock context
pub struct LockChain;

impl LockChain {
    /// Leases held by the running code; empty outside any lock scope
    pub fn current() -> HeldLocks {
        HELD.try_with(HeldLocks::clone).unwrap_or_default()
    }

    /// Run `fut` with `held` as its lock context.
    ///
    /// Pass [`LockChain::current`] into a spawned task that works on behalf of
    /// its parent and must re-enter the parent's locks. The parent should not
    /// touch those resources while the child runs.
    pub async fn scope_with<F>(held: HeldLocks, fut: F) -> F::Output
    where
        F: Future,
    {
        HELD.scope(held, fut).await
    }

    pub(crate) async fn holding<F>(mutex: u64, key: &str, lease: u64, fut: F) -> F::Output
    where
        F: Future,
    {
        let held = Self::current().with(mutex, key, lease);
        HELD.scope(held, fut).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_nothing_held_outside_a_scope() {
        assert!(LockChain::current().is_empty());
    }

    #[tokio::test]
    async fn test_holding_extends_only_the_inner_scope() {
        LockChain::holding(1, "a.json", 7, async {
            let outer = LockChain::current();
            assert_eq!(outer.lease_for(1, "a.json"), Some(7));
            assert_eq!(outer.lease_for(2, "a.json"), None);

            LockChain::holding(1, "b.json", 8, async {
                let inner = LockChain::current();
                assert_eq!(inner.len(), 2);
                assert!(inner.holds("a.json"));
            })
            .await;

            assert!(!LockChain::current().holds("b.json"));
        })
        .await;
        assert!(LockChain::current().is_empty());
    }

    #[tokio::test]
    async fn test_relisting_a_key_replaces_its_lease() {
        let held = HeldLocks::default().with(1, "a.json", 3).with(1, "a.json", 9);
        assert_eq!(held.len(), 1);
        assert_eq!(held.lease_for(1, "a.json"), Some(9));
    }

    #[tokio::test]
    async fn test_spawned_task_starts_empty_unless_handed_the_context() {
        LockChain::holding(1, "a.json", 7, async {
            let plain = tokio::spawn(async { LockChain::current() }).await.unwrap();
            assert!(plain.is_empty());

            let handed = tokio::spawn(LockChain::scope_with(LockChain::current(), async {
                LockChain::current()
            }))
            .await
            .unwrap();
            assert_eq!(handed.lease_for(1, "a.json"), Some(7));
        })
        .await;
    }
}
