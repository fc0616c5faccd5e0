//! Error types for the storage layer.

use thiserror::Error;

/// Errors that can occur while talking to storage backends.
///
/// A single backend failing inside a replicated write is logged and swallowed;
/// only [`StorageError::Unavailable`] reaches callers in that case.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StorageError {
    /// Every redundant backend failed for this operation.
    #[error("All storage backends failed to {operation} '{key}'")]
    Unavailable {
        /// The operation that was attempted
        operation: &'static str,
        /// The key (or prefix) involved
        key: String,
    },

    /// A single backend reported a failure.
    #[error("Storage backend '{store}' failed: {reason}")]
    Backend {
        /// Name of the backend
        store: String,
        /// Description of the failure
        reason: String,
    },

    /// File I/O error in a file-backed store.
    #[error("File I/O error on {path}")]
    FileIo {
        /// Path of the backing file
        path: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Persisted content could not be parsed.
    #[error("Corrupted data in '{store}'")]
    Corrupted {
        /// Name of the backend
        store: String,
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Check if this error means no backend could serve the request.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable { .. })
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        matches!(self, StorageError::FileIo { .. })
    }

    /// Check if this error indicates unreadable persisted data.
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, StorageError::Corrupted { .. })
    }
}

impl From<StorageError> for crate::Error {
    fn from(err: StorageError) -> Self {
        crate::Error::Storage(err)
    }
}
