use serde::{Deserialize, Serialize};

/// One persisted ledger block, exactly as it sits in the block log.
///
/// `payload` is the canonical string form of the block payload, so the row
/// alone is enough to recompute the block hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRow {
    pub block_index: u64,
    pub timestamp: String,
    pub payload: String,
    pub previous_hash: String,
    pub block_hash: String,
    pub operation_tag: String,
}
