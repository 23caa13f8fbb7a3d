use serde::Serialize;

use gl_crypto::ChainError;

/// Which of the two per-block checks failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The stored hash differs from the hash recomputed from the block's contents.
    HashMismatch,
    /// The block's previous hash differs from its predecessor's stored hash.
    BrokenLink,
}

/// The first integrity failure found in a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub index: u64,
    pub kind: ViolationKind,
}

/// Result of verifying a chain.
///
/// An invalid chain is a normal outcome, not an error: `valid` is `false`,
/// `message` names the block and the failed check, and `violation` carries
/// the same in structured form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub valid: bool,
    pub message: String,
    pub violation: Option<Violation>,
}

impl Verification {
    /// A chain holding at most the genesis block.
    pub fn trivial() -> Self {
        Self {
            valid: true,
            message: "Genesis block or empty blockchain is valid".into(),
            violation: None,
        }
    }

    pub fn intact() -> Self {
        Self {
            valid: true,
            message: "Blockchain is valid".into(),
            violation: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl From<ChainError> for Verification {
    fn from(err: ChainError) -> Self {
        let kind = match err {
            ChainError::HashMismatch { .. } => ViolationKind::HashMismatch,
            ChainError::BrokenLink { .. } => ViolationKind::BrokenLink,
        };
        Self {
            valid: false,
            message: err.to_string(),
            violation: Some(Violation {
                index: err.index() as u64,
                kind,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_mismatch_message() {
        let v = Verification::from(ChainError::HashMismatch { index: 4 });
        assert!(!v.is_valid());
        assert_eq!(v.message, "Block 4 hash is invalid");
        assert_eq!(
            v.violation,
            Some(Violation {
                index: 4,
                kind: ViolationKind::HashMismatch
            })
        );
    }

    #[test]
    fn broken_link_message() {
        let v = Verification::from(ChainError::BrokenLink { index: 2 });
        assert_eq!(v.message, "Block 2 chain link is broken");
        assert_eq!(v.violation.map(|x| x.kind), Some(ViolationKind::BrokenLink));
    }

    #[test]
    fn valid_results_carry_no_violation() {
        assert!(Verification::trivial().is_valid());
        assert!(Verification::intact().violation.is_none());
        assert_eq!(Verification::intact().message, "Blockchain is valid");
    }
}
