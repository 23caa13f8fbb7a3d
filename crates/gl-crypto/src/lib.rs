//! Hashing primitives for the Grade Ledger.
//!
//! Provides the canonical (sorted-key, whitespace-free) JSON encoding used
//! for block payloads, the SHA-256 block hash, and hash chain verification.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod canonical;
pub mod chain;
pub mod hasher;

pub use canonical::{canonical_json, to_canonical_string, CanonicalError};
pub use chain::{ChainError, HashChainVerifier, HashLinked};
pub use hasher::{BlockHasher, GENESIS_PREVIOUS_HASH};
