//! Snapshot Source Port
//!
//! Seam between the registry and whatever builds snapshots.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::market::Snapshot;

/// Builds complete snapshots.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Build a fresh snapshot.
    async fn build_snapshot(&self) -> Result<Arc<Snapshot>, SnapshotError>;
}

/// Snapshot build error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// The build could not complete.
    #[error("snapshot build failed: {message}")]
    BuildFailed {
        /// Error details.
        message: String,
    },
}
