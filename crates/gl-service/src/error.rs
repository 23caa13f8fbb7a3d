use std::path::PathBuf;

use thiserror::Error;

use gl_ledger::LedgerError;
use gl_store::StoreError;
use gl_types::RecordId;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("record {0} is already deleted")]
    RecordInactive(RecordId),

    /// The record table rejected a write. The ledger was not touched.
    #[error("record write failed: {0}")]
    StoreWrite(#[source] StoreError),

    /// The record write committed but its block could not be persisted.
    #[error("record {record_id} was written but its ledger block was not persisted: {source}")]
    LedgerPersist {
        record_id: RecordId,
        #[source]
        source: LedgerError,
    },

    #[error("store error: {0}")]
    Store(#[source] StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("invalid config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("service lock poisoned")]
    LockPoisoned,
}

pub type ServiceResult<T> = Result<T, ServiceError>;
