//! Configuration for the resource lock manager

use serde::{Deserialize, Serialize};
use std::time::Duration;
use taskstore_core::{
    env_flag, env_override, Error, Result, DEFAULT_ALLOW_REENTRANCY, DEFAULT_LOCK_TIMEOUT,
    LOCK_REENTRANT_VAR, LOCK_TIMEOUT_MS_VAR,
};

/// Configuration for [`ResourceMutex`](super::ResourceMutex)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MutexConfig {
    /// How long a queued acquisition waits before failing
    #[serde(with = "taskstore_core::serde_helpers::duration_ms")]
    pub timeout: Duration,
    /// Whether a chain already holding a resource may acquire it again
    pub allow_reentrancy: bool,
}

impl Default for MutexConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_LOCK_TIMEOUT,
            allow_reentrancy: DEFAULT_ALLOW_REENTRANCY,
        }
    }
}

impl MutexConfig {
    /// Defaults overridden by `TASKSTORE_LOCK_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `TASKSTORE_LOCK_*` environment variables on top of `self`
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(ms) = env_override::<u64>(LOCK_TIMEOUT_MS_VAR)? {
            self.timeout = Duration::from_millis(ms);
        }
        if let Some(flag) = env_flag(LOCK_REENTRANT_VAR)? {
            self.allow_reentrancy = flag;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_reentrancy(mut self, allow: bool) -> Self {
        self.allow_reentrancy = allow;
        self
    }

    /// Reject values that would make every contended acquire fail instantly
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::configuration("lock timeout must be greater than zero"));
        }
        Ok(())
    }
}
