//! Synchronisation primitives shared by the store adapters.
//!
//! ## Key Components
//!
//! - **`resource_mutex`**: per-resource locks with FIFO queues, timeouts,
//!   reentrancy and forced release.
//! - **`chain`**: execution-scoped set of held locks used for reentrancy.
//! - **`config`**: `MutexConfig` and its environment overrides.

mod chain;
mod config;
mod resource_mutex;

pub use chain::{HeldLocks, LockChain};
pub use config::MutexConfig;
pub use resource_mutex::{MutexStats, ResourceGuard, ResourceMutex};

#[cfg(test)]
mod tests;
