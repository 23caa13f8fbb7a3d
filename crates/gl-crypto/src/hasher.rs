use sha2::{Digest, Sha256};

/// Previous-hash value carried by a genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Field separator in the hashed preimage.
const DELIMITER: char = '|';

/// SHA-256 block hasher.
///
/// The preimage is `index|timestamp|payload|previous_hash`, UTF-8 encoded,
/// where `payload` is already in canonical form (see
/// [`crate::canonical_json`]) or the direct string of a scalar payload. The
/// output is the lowercase hex digest.
pub struct BlockHasher;

impl BlockHasher {
    /// Hash one block's contents.
    pub fn digest(index: u64, timestamp: &str, payload: &str, previous_hash: &str) -> String {
        let preimage = Self::preimage(index, timestamp, payload, previous_hash);
        Self::raw_hex(preimage.as_bytes())
    }

    /// The exact string that [`BlockHasher::digest`] hashes.
    pub fn preimage(index: u64, timestamp: &str, payload: &str, previous_hash: &str) -> String {
        format!("{index}{DELIMITER}{timestamp}{DELIMITER}{payload}{DELIMITER}{previous_hash}")
    }

    /// SHA-256 of arbitrary bytes as lowercase hex.
    pub fn raw_hex(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    /// Verify that block contents produce the expected digest.
    pub fn verify(
        index: u64,
        timestamp: &str,
        payload: &str,
        previous_hash: &str,
        expected: &str,
    ) -> bool {
        Self::digest(index, timestamp, payload, previous_hash) == expected
    }
}
