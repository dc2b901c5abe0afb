//! Error types for storage operations.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The store has been closed and can no longer be used.
    #[error("store is closed")]
    Closed,

    /// An empty key was supplied.
    #[error("keys must not be empty")]
    EmptyKey,

    /// The store contents are inconsistent.
    #[error("store corrupted: {0}")]
    Corrupted(String),
}
