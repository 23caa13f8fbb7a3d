//! Storage backends for the Grade Ledger.
//!
//! Two tables back the system:
//!
//! - the **record table** of student grade records, with logical deletion
//!   through an `active` flag ([`RecordStore`]);
//! - the **block log** that mirrors the in-memory hash chain
//!   ([`LedgerStore`]). Rows carry the payload in its canonical string form so
//!   a reloaded block hashes over the same bytes it was written with.
//!
//! # Storage Backends
//!
//! - [`InMemoryRecordStore`] / [`InMemoryLedgerStore`] -- for tests and embedding
//! - [`JsonFileRecordStore`] -- whole table as one JSON document, replaced atomically
//! - [`JsonlLedgerStore`] -- append-only JSON-lines block log
//!
//! # Design Rules
//!
//! 1. Record identifiers are assigned by the store, start at 1, and are never reused.
//! 2. Deleted records stay in the table; only the by-id lookup returns them.
//! 3. The block log never rewrites a row; the only destructive call is `delete_all`.
//! 4. A duplicate block index is rejected as a conflict.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod row;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::{JsonFileRecordStore, JsonlLedgerStore};
pub use memory::{InMemoryLedgerStore, InMemoryRecordStore};
pub use row::BlockRow;
pub use traits::{LedgerStore, RecordStore};
