//! Persistent Cache Store Port (Driven Port)
//!
//! Best-effort key/value storage with TTL. Callers treat every error as
//! a cache miss.

use std::time::Duration;

use async_trait::async_trait;

/// Key/value store with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store name for logs.
    fn name(&self) -> &'static str;

    /// Read a live entry.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError>;

    /// Write an entry that expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheStoreError>;
}

/// Cache store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheStoreError {
    /// Store unreachable.
    #[error("cache store unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Store rejected a command.
    #[error("cache store command failed: {message}")]
    CommandFailed {
        /// Error details.
        message: String,
    },
}
