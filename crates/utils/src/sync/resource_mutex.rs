//! Per-resource mutual exclusion.
//!
//! Each resource key (usually a file path) has at most one holder and a FIFO
//! queue of waiters. Keys are independent: contention on one never delays
//! another. Queued acquisitions fail with [`Error::MutexTimeout`] once they
//! have waited for the configured timeout.
//!
//! When reentrancy is enabled, code that already holds a key may take it
//! again. "Already holds" means the key is in the current [`LockChain`]
//! context (inside [`ResourceMutex::with_lock`] or [`ResourceGuard::scope`]),
//! or the caller re-enters explicitly with [`ResourceGuard::reenter`].
//!
//! [`LockChain`]: super::LockChain

use super::chain::LockChain;
use super::config::MutexConfig;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskstore_core::{Error, Result};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Lock manager serializing access to named resources
#[derive(Clone)]
pub struct ResourceMutex {
    inner: Arc<MutexInner>,
}

static NEXT_MUTEX_ID: AtomicU64 = AtomicU64::new(1);

struct MutexInner {
    /// Distinguishes managers in a chain's held set
    id: u64,
    config: MutexConfig,
    resources: DashMap<String, ResourceState>,
    next_lease: AtomicU64,
    next_ticket: AtomicU64,
}

#[derive(Default)]
struct ResourceState {
    holder: Option<LockEntry>,
    waiters: VecDeque<WaitEntry>,
}

impl ResourceState {
    fn is_idle(&self) -> bool {
        self.holder.is_none() && self.waiters.is_empty()
    }
}

struct LockEntry {
    /// Identifies one granted acquisition; reentrant guards share it
    lease: u64,
    depth: usize,
    acquired_at: Instant,
}

struct WaitEntry {
    ticket: u64,
    grant: oneshot::Sender<Grant>,
}

enum Grant {
    Acquired(Admitted),
    ForcedRelease,
}

#[derive(Clone, Copy)]
struct Admitted {
    lease: u64,
    depth: usize,
    acquired_at: Instant,
}

/// Aggregate view of the lock table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutexStats {
    /// Resources with an active holder
    pub locked_resources: usize,
    /// Queued acquisitions across all resources
    pub total_waiters: usize,
    /// Resources with at least one queued acquisition
    pub resources_with_waiters: usize,
}

impl Default for ResourceMutex {
    fn default() -> Self {
        Self::new(MutexConfig::default())
    }
}

impl fmt::Debug for ResourceMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceMutex")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl ResourceMutex {
    /// Create a lock manager with the given configuration
    pub fn new(config: MutexConfig) -> Self {
        Self {
            inner: Arc::new(MutexInner {
                id: NEXT_MUTEX_ID.fetch_add(1, Ordering::Relaxed),
                config,
                resources: DashMap::new(),
                next_lease: AtomicU64::new(1),
                next_ticket: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &MutexConfig {
        &self.inner.config
    }

    /// Wait until the caller is the sole holder of `key`.
    ///
    /// Waiters are served in arrival order. Fails with
    /// [`Error::MutexTimeout`] after waiting `config.timeout`, or with
    /// [`Error::ForcedRelease`] if [`release_all`](Self::release_all) runs
    /// while queued. The lock is held until the returned guard is released or
    /// dropped.
    ///
    /// Inside a lock scope that already holds `key` this re-enters instead of
    /// waiting (see [`ResourceGuard::scope`]).
    pub async fn acquire(&self, key: impl Into<String>) -> Result<ResourceGuard> {
        let key = key.into();
        let held = LockChain::current().lease_for(self.inner.id, &key);

        let mut ticket = {
            let mut state = self.inner.resources.entry(key.clone()).or_default();
            if let Some(admitted) = self.inner.try_admit(&mut state, held) {
                drop(state);
                debug!(key = %key, depth = admitted.depth, "lock acquired");
                return Ok(self.guard(key, admitted));
            }

            let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
            let (grant, receiver) = oneshot::channel();
            state.waiters.push_back(WaitEntry { ticket, grant });
            debug!(
                key = %key,
                position = state.waiters.len(),
                "resource busy, queued for lock"
            );

            WaitTicket {
                inner: Arc::clone(&self.inner),
                key: key.clone(),
                ticket,
                receiver,
                settled: false,
            }
        };

        let timeout = self.inner.config.timeout;
        let queued_at = Instant::now();
        let outcome = tokio::time::timeout(timeout, ticket.granted()).await;

        match outcome {
            Ok(Ok(admitted)) => {
                debug!(
                    key = %key,
                    waited_ms = queued_at.elapsed().as_millis() as u64,
                    "lock acquired after wait"
                );
                Ok(self.guard(key, admitted))
            }
            Ok(Err(err)) => Err(err),
            Err(_elapsed) => match ticket.withdraw() {
                Withdrawal::Left => {
                    warn!(
                        key = %key,
                        timeout_ms = timeout.as_millis() as u64,
                        "timed out waiting for lock"
                    );
                    Err(Error::mutex_timeout(key, timeout))
                }
                // Handed over just as the timer fired
                Withdrawal::Granted(admitted) => Ok(self.guard(key, admitted)),
                Withdrawal::Rejected => Err(Error::forced_release(key)),
            },
        }
    }

    /// Take `key` only if that is possible without waiting
    pub fn try_acquire(&self, key: impl Into<String>) -> Option<ResourceGuard> {
        let key = key.into();
        let held = LockChain::current().lease_for(self.inner.id, &key);

        let admitted = {
            let mut state = self.inner.resources.entry(key.clone()).or_default();
            self.inner.try_admit(&mut state, held)
        };

        match admitted {
            Some(admitted) => {
                debug!(key = %key, depth = admitted.depth, "lock acquired without waiting");
                Some(self.guard(key, admitted))
            }
            None => {
                debug!(key = %key, "lock busy, try_acquire gave up");
                None
            }
        }
    }

    /// Run `f` while holding `key`.
    ///
    /// `f` runs in a lock scope that holds `key`, so anything it awaits may
    /// re-acquire `key` when reentrancy is enabled. Futures running beside
    /// this call do not share that scope and still wait their turn. The lock
    /// is released on every exit path, including panics and cancellation.
    pub async fn with_lock<F, Fut, T>(&self, key: impl Into<String>, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let guard = self.acquire(key).await?;
        let output = guard.scope(async move { f().await }).await;
        guard.release();
        Ok(output)
    }

    /// Whether `key` currently has a holder
    pub fn is_locked(&self, key: &str) -> bool {
        self.inner
            .resources
            .get(key)
            .is_some_and(|state| state.holder.is_some())
    }

    /// Number of acquisitions queued behind the holder of `key`
    pub fn wait_count(&self, key: &str) -> usize {
        self.inner
            .resources
            .get(key)
            .map_or(0, |state| state.waiters.len())
    }

    pub fn stats(&self) -> MutexStats {
        self.inner
            .resources
            .iter()
            .fold(MutexStats::default(), |mut stats, entry| {
                if entry.holder.is_some() {
                    stats.locked_resources += 1;
                }
                if !entry.waiters.is_empty() {
                    stats.total_waiters += entry.waiters.len();
                    stats.resources_with_waiters += 1;
                }
                stats
            })
    }

    /// Drop every lock and reject every queued waiter.
    ///
    /// Only meant for shutdown and cleanup paths. Guards handed out before the
    /// call become inert: releasing them later does not touch locks acquired
    /// afterwards.
    pub fn release_all(&self) {
        let mut released = 0usize;
        let mut rejected = 0usize;

        self.inner.resources.retain(|key, state| {
            if state.holder.take().is_some() {
                released += 1;
            }
            for waiter in state.waiters.drain(..) {
                debug!(key = %key, ticket = waiter.ticket, "rejecting queued waiter");
                let _ = waiter.grant.send(Grant::ForcedRelease);
                rejected += 1;
            }
            false
        });

        if released > 0 || rejected > 0 {
            warn!(released, rejected, "forcefully released all resource locks");
        }
    }

    fn guard(&self, key: String, admitted: Admitted) -> ResourceGuard {
        ResourceGuard {
            inner: Arc::clone(&self.inner),
            key,
            lease: admitted.lease,
            acquired_at: admitted.acquired_at,
            released: false,
        }
    }
}

impl MutexInner {
    fn next_lease(&self) -> u64 {
        self.next_lease.fetch_add(1, Ordering::Relaxed)
    }

    /// Grant `state` if it is free, or re-enter it if `held` is the current
    /// holder's lease
    fn try_admit(&self, state: &mut ResourceState, held: Option<u64>) -> Option<Admitted> {
        if state.holder.is_none() {
            let admitted = Admitted {
                lease: self.next_lease(),
                depth: 1,
                acquired_at: Instant::now(),
            };
            state.holder = Some(LockEntry {
                lease: admitted.lease,
                depth: 1,
                acquired_at: admitted.acquired_at,
            });
            return Some(admitted);
        }

        if let Some(holder) = state.holder.as_mut() {
            if self.config.allow_reentrancy && held == Some(holder.lease) {
                holder.depth += 1;
                return Some(Admitted {
                    lease: holder.lease,
                    depth: holder.depth,
                    acquired_at: Instant::now(),
                });
            }
        }

        None
    }

    fn release(&self, key: &str, lease: u64) {
        let mut idle = false;

        if let Some(mut entry) = self.resources.get_mut(key) {
            let state = &mut *entry;
            let Some(holder) = state.holder.as_mut() else {
                return;
            };
            if holder.lease != lease {
                // Guard from before a forced release
                return;
            }

            holder.depth -= 1;
            if holder.depth > 0 {
                debug!(key = %key, depth = holder.depth, "reentrant lock level released");
                return;
            }

            let held_ms = holder.acquired_at.elapsed().as_millis() as u64;
            state.holder = None;
            debug!(key = %key, held_ms, "lock released");

            self.hand_off(key, state);
            idle = state.is_idle();
        }

        if idle {
            self.resources.remove_if(key, |_, state| state.is_idle());
        }
    }

    /// Pass a free resource to the first waiter still listening
    fn hand_off(&self, key: &str, state: &mut ResourceState) {
        while let Some(waiter) = state.waiters.pop_front() {
            let admitted = Admitted {
                lease: self.next_lease(),
                depth: 1,
                acquired_at: Instant::now(),
            };
            if waiter.grant.send(Grant::Acquired(admitted)).is_ok() {
                state.holder = Some(LockEntry {
                    lease: admitted.lease,
                    depth: 1,
                    acquired_at: admitted.acquired_at,
                });
                debug!(
                    key = %key,
                    ticket = waiter.ticket,
                    remaining = state.waiters.len(),
                    "lock handed to next waiter"
                );
                return;
            }
        }
    }
}

/// A queued acquisition. Dropping it unsettled takes it out of the queue.
struct WaitTicket {
    inner: Arc<MutexInner>,
    key: String,
    ticket: u64,
    receiver: oneshot::Receiver<Grant>,
    settled: bool,
}

enum Withdrawal {
    Left,
    Granted(Admitted),
    Rejected,
}

impl WaitTicket {
    async fn granted(&mut self) -> Result<Admitted> {
        let outcome = (&mut self.receiver).await;
        self.settled = true;
        match outcome {
            Ok(Grant::Acquired(admitted)) => Ok(admitted),
            Ok(Grant::ForcedRelease) | Err(_) => Err(Error::forced_release(self.key.as_str())),
        }
    }

    /// Leave the queue, reporting what happened if it was too late to leave
    fn withdraw(&mut self) -> Withdrawal {
        self.settled = true;

        if let Some(mut state) = self.inner.resources.get_mut(&self.key) {
            let ticket = self.ticket;
            if let Some(position) = state.waiters.iter().position(|w| w.ticket == ticket) {
                state.waiters.remove(position);
                return Withdrawal::Left;
            }
        }

        // Grants are sent under the shard lock, so anything sent is visible now
        match self.receiver.try_recv() {
            Ok(Grant::Acquired(admitted)) => Withdrawal::Granted(admitted),
            Ok(Grant::ForcedRelease) => Withdrawal::Rejected,
            Err(_) => Withdrawal::Left,
        }
    }
}

impl Drop for WaitTicket {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Withdrawal::Granted(admitted) = self.withdraw() {
            debug!(key = %self.key, "acquire cancelled after hand-off, passing lock on");
            self.inner.release(&self.key, admitted.lease);
        }
    }
}

/// Release capability for one acquisition of a resource.
///
/// Dropping the guard releases the lock; [`release`](Self::release) does the
/// same explicitly. For reentrant acquisitions each guard releases one level.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ResourceGuard {
    inner: Arc<MutexInner>,
    key: String,
    lease: u64,
    acquired_at: Instant,
    released: bool,
}

impl ResourceGuard {
    /// The resource key this guard holds
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Time since this guard was handed out
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// Run `fut` in a lock scope that holds this guard's key, so acquisitions
    /// of the same key inside it re-enter instead of waiting
    pub async fn scope<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        LockChain::holding(self.inner.id, &self.key, self.lease, fut).await
    }

    /// Take one more reentrant level of this guard's lock.
    ///
    /// `None` when reentrancy is disabled, or when the lock was taken away
    /// by [`ResourceMutex::release_all`].
    pub fn reenter(&self) -> Option<ResourceGuard> {
        let admitted = {
            let mut state = self.inner.resources.get_mut(&self.key)?;
            if state.holder.as_ref().map(|holder| holder.lease) != Some(self.lease) {
                return None;
            }
            self.inner.try_admit(&mut state, Some(self.lease))
        }?;
        debug!(key = %self.key, depth = admitted.depth, "lock re-entered");
        Some(ResourceGuard {
            inner: Arc::clone(&self.inner),
            key: self.key.clone(),
            lease: admitted.lease,
            acquired_at: admitted.acquired_at,
            released: false,
        })
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.inner.release(&self.key, self.lease);
        }
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for ResourceGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceGuard")
            .field("key", &self.key)
            .field("lease", &self.lease)
            .field("released", &self.released)
            .finish()
    }
}
