//! Append-only, hash-chained tamper-evidence ledger.
//!
//! Every mutation of the grade record table is mirrored by one block in this
//! ledger. Each block's hash covers its index, capture timestamp, canonical
//! payload, and its predecessor's hash, so any retroactive edit of a stored
//! block is detectable by recomputing hashes and comparing links.
//!
//! This crate provides:
//! - [`Block`] and its typed [`Payload`] / [`OperationTag`]
//! - [`Ledger`], the single-writer chain mirrored to a [`gl_store::LedgerStore`]
//! - [`Verification`], the structured result of an integrity check
//! - [`LedgerStats`] for user-facing counts

pub mod block;
pub mod error;
pub mod ledger;
pub mod verification;

pub use block::{
    Block, DeletePayload, InsertPayload, Operation, OperationTag, Payload, GENESIS_MARKER,
};
pub use error::LedgerError;
pub use ledger::{Ledger, LedgerStats};
pub use verification::{Verification, Violation, ViolationKind};
