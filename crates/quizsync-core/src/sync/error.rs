//! Sync error types

use thiserror::Error;

use super::status::Direction;
use crate::remote::RemoteError;
use crate::storage::StorageError;

/// Terminal failure of a pull or push run
#[derive(Error, Debug)]
pub enum SyncError {
    /// Fetching the remote collection failed; the cache was not touched
    #[error("Failed to fetch remote collection: {0}")]
    Network(#[source] RemoteError),

    /// The batch commit failed; neither store was modified
    #[error("Failed to commit {attempted} record(s) to the remote store: {source}")]
    Commit {
        attempted: usize,
        #[source]
        source: RemoteError,
    },

    /// The local cache failed
    #[error("Local cache error: {0}")]
    Storage(#[from] StorageError),

    /// Another run of the same direction is in progress
    #[error("A {0} is already running")]
    AlreadyRunning(Direction),
}

impl SyncError {
    /// Remote side failed (fetch or commit)
    pub fn is_network(&self) -> bool {
        matches!(self, SyncError::Network(_) | SyncError::Commit { .. })
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, SyncError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let network = SyncError::Network(RemoteError::Unavailable("offline".into()));
        assert!(network.is_network());
        assert!(!network.is_storage());

        let commit = SyncError::Commit {
            attempted: 4,
            source: RemoteError::Unavailable("quota".into()),
        };
        assert!(commit.is_network());
        assert!(commit.to_string().contains("4 record(s)"));

        let storage = SyncError::from(StorageError::unavailable("cache is closed"));
        assert!(storage.is_storage());

        let busy = SyncError::AlreadyRunning(Direction::Pull);
        assert_eq!(busy.to_string(), "A pull is already running");
    }
}
