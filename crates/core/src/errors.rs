use std::time::Duration;

/// Result type alias for taskstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by the locking and caching layers
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A queued lock acquisition waited longer than the configured timeout
    #[error("timed out after {}ms waiting for lock on '{key}'", .timeout.as_millis())]
    MutexTimeout { key: String, timeout: Duration },

    /// A queued waiter was rejected because every lock was forcefully released
    #[error("lock on '{key}' was forcefully released")]
    ForcedRelease { key: String },

    /// A cache key does not follow the `namespace:identifier[:tag]` layout
    #[error("invalid cache key format '{key}': {reason}")]
    InvalidKeyFormat { key: String, reason: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

// Helper methods for creating errors with context
impl Error {
    /// Create a mutex timeout error
    #[must_use]
    pub fn mutex_timeout(key: impl Into<String>, timeout: Duration) -> Self {
        Error::MutexTimeout {
            key: key.into(),
            timeout,
        }
    }

    /// Create a forced release error
    #[must_use]
    pub fn forced_release(key: impl Into<String>) -> Self {
        Error::ForcedRelease { key: key.into() }
    }

    /// Create an invalid key format error
    #[must_use]
    pub fn invalid_key_format(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidKeyFormat {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Whether the failure came from contention and the operation may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::MutexTimeout { .. })
    }

    /// Message suitable for an interactive user at the CLI boundary.
    ///
    /// Contention is reported as "resource busy" so it reads differently from
    /// an internal failure; everything else falls back to the `Display` text.
    pub fn user_message(&self) -> String {
        match self {
            Error::MutexTimeout { key, .. } => {
                format!("resource busy, try again ('{key}' is locked by another operation)")
            }
            Error::ForcedRelease { key } => {
                format!("operation on '{key}' was interrupted during shutdown")
            }
            other => other.to_string(),
        }
    }
}
