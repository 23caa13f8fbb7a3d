/// Trait for entries that participate in a hash chain.
pub trait HashLinked {
    /// The entry's stored hash.
    fn stored_hash(&self) -> &str;
    /// The stored hash of the predecessor (`"0"` for genesis).
    fn previous_hash(&self) -> &str;
    /// Recompute the entry's hash from its stored contents.
    ///
    /// `None` means the contents could not be canonicalized, which counts as
    /// a hash mismatch.
    fn recompute_hash(&self) -> Option<String>;
}

/// Hash chain integrity verifier.
///
/// Walks a chain from position 1 to the tail. For each entry it first
/// recomputes the entry's hash from its contents, then checks that the
/// entry's previous hash matches its predecessor's stored hash. The first
/// failure is reported; the genesis entry at position 0 is the trust anchor
/// and is not itself rehashed.
pub struct HashChainVerifier;

impl HashChainVerifier {
    /// Verify a chain, short-circuiting on the first failure.
    pub fn verify_chain<T: HashLinked>(entries: &[T]) -> Result<(), ChainError> {
        for (offset, pair) in entries.windows(2).enumerate() {
            Self::verify_entry(&pair[0], &pair[1], offset + 1)?;
        }
        Ok(())
    }

    /// Verify one entry against its predecessor. `position` is used only for
    /// error reporting.
    pub fn verify_entry<T: HashLinked>(
        previous: &T,
        current: &T,
        position: usize,
    ) -> Result<(), ChainError> {
        match current.recompute_hash() {
            Some(expected) if expected == current.stored_hash() => {}
            _ => return Err(ChainError::HashMismatch { index: position }),
        }

        if current.previous_hash() != previous.stored_hash() {
            return Err(ChainError::BrokenLink { index: position });
        }

        Ok(())
    }
}

/// Errors from chain verification.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum ChainError {
    #[error("Block {index} hash is invalid")]
    HashMismatch { index: usize },

    #[error("Block {index} chain link is broken")]
    BrokenLink { index: usize },
}

impl ChainError {
    /// Position of the offending entry.
    pub fn index(&self) -> usize {
        match self {
            ChainError::HashMismatch { index } | ChainError::BrokenLink { index } => *index,
        }
    }
}
