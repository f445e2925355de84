//! Storage error handling
//!
//! Provides typed errors for cache operations with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::Path;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// The cache cannot be used at all (closed, unopenable, read-only,
    /// disk full or quota exceeded, I/O failure)
    #[error("Local storage unavailable: {reason}")]
    Unavailable { reason: String },

    /// Database was written by a newer version of quizsync
    #[error("Cache schema version {found} is newer than supported version {supported}; refusing to open")]
    UnsupportedVersion { found: i32, supported: i32 },

    /// A question record without an identity cannot be keyed
    #[error("Question record has no identity")]
    MissingIdentity,

    /// A stored row could not be decoded
    #[error("Stored record '{key}' is corrupted: {details}")]
    Corrupt { key: String, details: String },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    /// Record could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        StorageError::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create an error from an I/O error with path context
    ///
    /// Permission problems and full disks make storage unavailable.
    pub fn from_io(error: io::Error, path: &Path) -> Self {
        let reason = match error.kind() {
            io::ErrorKind::PermissionDenied => {
                format!("permission denied for '{}'", path.display())
            }
            _ if is_disk_full_error(&error) => {
                format!("disk full or quota exceeded at '{}'", path.display())
            }
            _ => format!("'{}': {}", path.display(), error),
        };
        StorageError::Unavailable { reason }
    }

    /// Whether the storage itself is inaccessible
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable { .. })
    }

    /// Check if this error is recoverable by the user
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::Unavailable { .. } | StorageError::Corrupt { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::Unavailable { .. } => Some(
                "Check that the data directory exists, is writable, and has free space.",
            ),
            StorageError::UnsupportedVersion { .. } => {
                Some("Upgrade quizsync, or point data_dir at a different location.")
            }
            StorageError::Corrupt { .. } => {
                Some("Run `quizsync pull` to rebuild the question cache from the remote store.")
            }
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(error: rusqlite::Error) -> Self {
        match error.sqlite_error_code() {
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::DiskFull
                | ErrorCode::ReadOnly
                | ErrorCode::SystemIoFailure
                | ErrorCode::PermissionDenied
                | ErrorCode::OutOfMemory,
            ) => StorageError::Unavailable {
                reason: error.to_string(),
            },
            _ => StorageError::Database(error),
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_is_unavailable() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = StorageError::from_io(io_err, Path::new("/test/path"));

        assert!(err.is_unavailable());
        assert!(err.to_string().contains("permission denied"));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_disk_full_detection() {
        let io_err = io::Error::new(io::ErrorKind::Other, "No space left on device");
        let err = StorageError::from_io(io_err, Path::new("/full/disk"));

        assert!(err.is_unavailable());
        assert!(err.to_string().contains("quota exceeded"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_sqlite_full_is_unavailable() {
        let sqlite_err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
            None,
        );
        assert!(StorageError::from(sqlite_err).is_unavailable());
    }

    #[test]
    fn test_constraint_is_database_error() {
        let sqlite_err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            None,
        );
        assert!(matches!(
            StorageError::from(sqlite_err),
            StorageError::Database(_)
        ));
    }

    #[test]
    fn test_unsupported_version_display() {
        let err = StorageError::UnsupportedVersion {
            found: 9,
            supported: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("9"));
        assert!(msg.contains("refusing"));
        assert!(!err.is_recoverable());
    }
}
