use gl_crypto::CanonicalError;
use gl_store::StoreError;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The persisted chain could not be read; the ledger cannot start.
    #[error("failed to load ledger: {0}")]
    Load(#[source] StoreError),

    /// The persisted rows do not start with a genesis block.
    #[error("ledger has no genesis block; first stored block is {first_index}")]
    MissingGenesis { first_index: u64 },

    /// The persisted rows skip or repeat an index.
    #[error("ledger is not contiguous: expected block {expected}, found block {found}")]
    Discontinuous { expected: u64, found: u64 },

    /// The chain holds no blocks, after a reset that could not complete.
    /// `Ledger::initialize` must succeed before further appends.
    #[error("ledger is not initialized")]
    Uninitialized,

    /// A block was built but could not be persisted. The in-memory chain is
    /// unchanged.
    #[error("failed to persist block {index}: {source}")]
    Persist {
        index: u64,
        #[source]
        source: StoreError,
    },

    /// The block log could not be cleared during a reset.
    #[error("failed to clear ledger: {0}")]
    Clear(#[source] StoreError),

    /// The record store failed during a stats query or reset.
    #[error("record store error: {0}")]
    Records(#[source] StoreError),

    #[error("payload encoding error: {0}")]
    Canonical(#[from] CanonicalError),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}
