use std::path::PathBuf;

use gl_types::RecordId;

/// Errors from record and block store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// A block with this index is already persisted.
    #[error("block {index} already exists")]
    Conflict { index: u64 },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted file could not be decoded.
    #[error("corrupt store file {path} at line {line}: {reason}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// The backend cannot serve requests (poisoned lock, unreachable service).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
