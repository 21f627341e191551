//! Behavioural tests for the resource lock manager.
//!
//! Timing-sensitive tests run on a paused clock so timeouts fire exactly when
//! the test advances time.

use super::{LockChain, MutexConfig, MutexStats, ResourceMutex};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskstore_core::Error;

fn mutex_with_timeout(timeout: Duration) -> ResourceMutex {
    ResourceMutex::new(MutexConfig::default().with_timeout(timeout))
}

/// Yield until `expected` acquisitions are queued on `key`
async fn wait_for_waiters(mutex: &ResourceMutex, key: &str, expected: usize) {
    for _ in 0..1000 {
        if mutex.wait_count(key) >= expected {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!(
        "expected {expected} waiters on '{key}', saw {}",
        mutex.wait_count(key)
    );
}

#[tokio::test]
async fn test_acquire_and_release() {
    let mutex = ResourceMutex::default();

    let guard = mutex.acquire("tasks/tasks.json").await.unwrap();
    assert_eq!(guard.key(), "tasks/tasks.json");
    assert!(mutex.is_locked("tasks/tasks.json"));
    assert!(!mutex.is_locked("tasks/other.json"));

    guard.release();
    assert!(!mutex.is_locked("tasks/tasks.json"));
    assert_eq!(mutex.stats(), MutexStats::default());
}

#[tokio::test]
async fn test_try_acquire_does_not_wait() {
    let mutex = ResourceMutex::default();

    let held = mutex.try_acquire("a").expect("free resource");
    // Holding the guard is not enough; re-entry goes through the guard
    assert!(mutex.try_acquire("a").is_none());
    assert_eq!(mutex.wait_count("a"), 0);

    drop(held);
    assert!(mutex.try_acquire("a").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_independent_keys_do_not_block() {
    let mutex = mutex_with_timeout(Duration::from_millis(50));

    let _a = mutex.acquire("a.json").await.unwrap();
    let b = mutex.acquire("b.json").await.unwrap();

    assert!(mutex.is_locked("a.json"));
    assert!(mutex.is_locked("b.json"));
    drop(b);
}

#[tokio::test(start_paused = true)]
async fn test_waiters_served_in_arrival_order() {
    let mutex = ResourceMutex::default();
    let order = Arc::new(Mutex::new(Vec::new()));

    let holder = mutex.acquire("f.json").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..5 {
        let task_mutex = mutex.clone();
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            let guard = task_mutex.acquire("f.json").await.unwrap();
            order.lock().push(i);
            guard.release();
        }));
        wait_for_waiters(&mutex, "f.json", i + 1).await;
    }

    assert_eq!(mutex.wait_count("f.json"), 5);
    holder.release();

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    assert!(!mutex.is_locked("f.json"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_are_not_lost() {
    let mutex = ResourceMutex::default();
    let counter = Arc::new(AtomicU32::new(0));
    let active = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..20 {
        let mutex = mutex.clone();
        let counter = Arc::clone(&counter);
        let active = Arc::clone(&active);
        handles.push(tokio::spawn(async move {
            let guard = mutex.acquire("f.json").await.unwrap();
            assert_eq!(active.fetch_add(1, Ordering::SeqCst), 0, "two holders at once");

            // Read, suspend, write: loses updates without the lock
            let current = counter.load(Ordering::SeqCst);
            tokio::task::yield_now().await;
            tokio::time::sleep(Duration::from_millis(1)).await;
            counter.store(current + 1, Ordering::SeqCst);

            active.fetch_sub(1, Ordering::SeqCst);
            guard.release();
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 20);
    assert!(!mutex.is_locked("f.json"));
}

#[tokio::test]
async fn test_reentrant_acquire_needs_matching_releases() {
    let mutex = ResourceMutex::default();
    let first = mutex.acquire("f.json").await.unwrap();

    first
        .scope(async {
            let second = mutex.acquire("f.json").await.unwrap();
            let third = mutex.try_acquire("f.json").expect("reentrant fast path");

            third.release();
            assert!(mutex.is_locked("f.json"));
            second.release();
            assert!(mutex.is_locked("f.json"));
        })
        .await;

    first.release();
    assert!(!mutex.is_locked("f.json"));
}

#[tokio::test(start_paused = true)]
async fn test_holder_reenters_through_its_guard() {
    let mutex = mutex_with_timeout(Duration::from_millis(100));
    let first = mutex.acquire("f.json").await.unwrap();

    // A plain second acquire is a contender, even from the same function
    let err = mutex.acquire("f.json").await.unwrap_err();
    assert!(matches!(err, Error::MutexTimeout { .. }));

    let second = first.reenter().expect("reentrancy is on by default");
    first.release();
    assert!(mutex.is_locked("f.json"));
    second.release();
    assert!(!mutex.is_locked("f.json"));
}

#[tokio::test(start_paused = true)]
async fn test_sibling_futures_in_one_scope_stay_exclusive() {
    let mutex = ResourceMutex::default();
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let critical_section = || {
        let mutex = mutex.clone();
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        async move {
            mutex
                .with_lock("f.json", || async {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await
        }
    };

    mutex
        .with_lock("outer", || async {
            let (a, b) = tokio::join!(critical_section(), critical_section());
            a.unwrap();
            b.unwrap();
        })
        .await
        .unwrap();

    assert_eq!(peak.load(Ordering::SeqCst), 1, "two holders of f.json at once");
    assert_eq!(mutex.stats(), MutexStats::default());
}

#[tokio::test(start_paused = true)]
async fn test_waiter_served_only_after_reentrant_depth_reaches_zero() {
    let mutex = ResourceMutex::default();

    let outer = mutex.acquire("f.json").await.unwrap();
    let inner = outer.reenter().unwrap();

    let waiter = {
        let mutex = mutex.clone();
        tokio::spawn(async move { mutex.acquire("f.json").await })
    };
    wait_for_waiters(&mutex, "f.json", 1).await;

    inner.release();
    tokio::task::yield_now().await;
    assert_eq!(mutex.wait_count("f.json"), 1);
    assert!(!waiter.is_finished());

    outer.release();
    let guard = waiter.await.unwrap().unwrap();
    assert!(mutex.is_locked("f.json"));
    assert_eq!(mutex.wait_count("f.json"), 0);
    drop(guard);
}

#[tokio::test(start_paused = true)]
async fn test_non_reentrant_mutex_times_out_against_itself() {
    let mutex = ResourceMutex::new(
        MutexConfig::default()
            .with_timeout(Duration::from_millis(100))
            .with_reentrancy(false),
    );

    let held = mutex.acquire("f.json").await.unwrap();
    assert!(held.reenter().is_none());

    held.scope(async {
        assert!(mutex.try_acquire("f.json").is_none());

        let err = mutex.acquire("f.json").await.unwrap_err();
        match err {
            Error::MutexTimeout { key, timeout } => {
                assert_eq!(key, "f.json");
                assert_eq!(timeout, Duration::from_millis(100));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(mutex.wait_count("f.json"), 0);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_timeout_removes_waiter_without_touching_other_keys() {
    let mutex = mutex_with_timeout(Duration::from_millis(1000));

    let _a = mutex.acquire("a.json").await.unwrap();
    let b = mutex.acquire("b.json").await.unwrap();

    let waiter_a = {
        let mutex = mutex.clone();
        tokio::spawn(async move { mutex.acquire("a.json").await })
    };
    wait_for_waiters(&mutex, "a.json", 1).await;

    tokio::time::advance(Duration::from_millis(600)).await;

    let waiter_b = {
        let mutex = mutex.clone();
        tokio::spawn(async move { mutex.acquire("b.json").await })
    };
    wait_for_waiters(&mutex, "b.json", 1).await;

    // a's waiter is past its timeout, b's has waited only 500ms
    tokio::time::advance(Duration::from_millis(500)).await;

    let err = waiter_a.await.unwrap().unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(mutex.wait_count("a.json"), 0);
    assert_eq!(mutex.wait_count("b.json"), 1);

    b.release();
    let guard_b = waiter_b.await.unwrap().unwrap();
    assert_eq!(guard_b.key(), "b.json");
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_waiter_never_receives_the_lock_later() {
    let mutex = mutex_with_timeout(Duration::from_millis(100));

    let holder = mutex.acquire("f.json").await.unwrap();
    let result = mutex.acquire("f.json").await;
    assert!(matches!(result, Err(Error::MutexTimeout { .. })));

    holder.release();
    assert!(!mutex.is_locked("f.json"));
    assert_eq!(mutex.stats(), MutexStats::default());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_acquire_leaves_the_queue() {
    let mutex = ResourceMutex::default();
    let holder = mutex.acquire("f.json").await.unwrap();

    let waiter = {
        let mutex = mutex.clone();
        tokio::spawn(async move { mutex.acquire("f.json").await })
    };
    wait_for_waiters(&mutex, "f.json", 1).await;

    waiter.abort();
    assert!(waiter.await.unwrap_err().is_cancelled());
    assert_eq!(mutex.wait_count("f.json"), 0);

    holder.release();
    assert!(!mutex.is_locked("f.json"));
}

#[tokio::test(start_paused = true)]
async fn test_release_all_rejects_waiters_and_disarms_old_guards() {
    let mutex = ResourceMutex::default();
    let stale = mutex.acquire("f.json").await.unwrap();
    let _other = mutex.acquire("g.json").await.unwrap();

    let waiter = {
        let mutex = mutex.clone();
        tokio::spawn(async move { mutex.acquire("f.json").await })
    };
    wait_for_waiters(&mutex, "f.json", 1).await;

    mutex.release_all();

    let err = waiter.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::ForcedRelease { ref key } if key == "f.json"));
    assert!(!mutex.is_locked("f.json"));
    assert!(!mutex.is_locked("g.json"));
    assert_eq!(mutex.stats(), MutexStats::default());

    let fresh = mutex.try_acquire("f.json").expect("free after release_all");
    assert!(stale.reenter().is_none(), "stale guard re-entered a newer lock");
    drop(stale);
    assert!(mutex.is_locked("f.json"), "stale guard released a newer lock");
    drop(fresh);
    assert!(!mutex.is_locked("f.json"));
}

#[tokio::test(start_paused = true)]
async fn test_stats_reflect_holders_and_queues() {
    let mutex = ResourceMutex::default();
    let _a = mutex.acquire("a").await.unwrap();
    let _b = mutex.acquire("b").await.unwrap();

    let mut waiters = Vec::new();
    for expected in 1..=2 {
        let mutex_clone = mutex.clone();
        waiters.push(tokio::spawn(async move { mutex_clone.acquire("a").await }));
        wait_for_waiters(&mutex, "a", expected).await;
    }

    assert_eq!(
        mutex.stats(),
        MutexStats {
            locked_resources: 2,
            total_waiters: 2,
            resources_with_waiters: 1,
        }
    );

    let json = serde_json::to_value(mutex.stats()).unwrap();
    assert_eq!(json["lockedResources"], 2);
    assert_eq!(json["totalWaiters"], 2);
    assert_eq!(json["resourcesWithWaiters"], 1);

    for waiter in &waiters {
        waiter.abort();
    }
}

#[tokio::test]
async fn test_with_lock_releases_when_the_critical_section_fails() {
    let mutex = ResourceMutex::default();

    let outcome: Result<(), &str> = mutex
        .with_lock("f.json", || async { Err("write failed") })
        .await
        .unwrap();

    assert_eq!(outcome, Err("write failed"));
    assert!(!mutex.is_locked("f.json"));
}

#[tokio::test]
async fn test_with_lock_allows_nested_reentry() {
    let mutex = ResourceMutex::default();
    let nested = mutex.clone();

    let depth_seen = mutex
        .with_lock("f.json", || async move {
            let inner = nested.acquire("f.json").await.unwrap();
            let locked = nested.is_locked("f.json");
            inner.release();
            locked
        })
        .await
        .unwrap();

    assert!(depth_seen);
    assert!(!mutex.is_locked("f.json"));
}

#[tokio::test(start_paused = true)]
async fn test_spawned_task_reenters_only_when_handed_the_scope() {
    let mutex = mutex_with_timeout(Duration::from_millis(100));

    mutex
        .with_lock("f.json", || async {
            let plain = {
                let mutex = mutex.clone();
                tokio::spawn(async move { mutex.acquire("f.json").await.map(drop) })
            };
            assert!(matches!(
                plain.await.unwrap(),
                Err(Error::MutexTimeout { .. })
            ));

            let handed = {
                let mutex = mutex.clone();
                tokio::spawn(LockChain::scope_with(LockChain::current(), async move {
                    mutex.acquire("f.json").await.map(drop)
                }))
            };
            assert!(handed.await.unwrap().is_ok());
        })
        .await
        .unwrap();

    assert!(!mutex.is_locked("f.json"));
}

#[tokio::test]
async fn test_scopes_of_separate_managers_do_not_mix() {
    let first = ResourceMutex::default();
    let second = ResourceMutex::default();

    first
        .with_lock("f.json", || async {
            assert!(LockChain::current().holds("f.json"));
            let other = second.try_acquire("f.json").expect("free on the other manager");
            assert!(second.try_acquire("f.json").is_none());
            drop(other);
        })
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_guard_reports_hold_time() {
    let mutex = ResourceMutex::default();
    let guard = mutex.acquire("f.json").await.unwrap();

    tokio::time::advance(Duration::from_millis(250)).await;
    assert!(guard.held_for() >= Duration::from_millis(250));
}
