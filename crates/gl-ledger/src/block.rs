use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use gl_crypto::{to_canonical_string, BlockHasher, CanonicalError, HashLinked, GENESIS_PREVIOUS_HASH};
use gl_store::BlockRow;
use gl_types::{Grade, NewGrade, RecordId, Semester, Timestamp};

/// Payload carried by every genesis block.
pub const GENESIS_MARKER: &str = "Genesis Block - Student Grade System";

/// Snapshot of a freshly inserted grade record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertPayload {
    pub record_id: RecordId,
    pub student_name: String,
    pub student_id: String,
    pub subject: String,
    pub grade: Grade,
    pub semester: Semester,
    pub remarks: String,
    pub timestamp: Timestamp,
}

impl InsertPayload {
    pub fn new(record_id: RecordId, grade: &NewGrade, timestamp: Timestamp) -> Self {
        Self {
            record_id,
            student_name: grade.student_name.clone(),
            student_id: grade.student_id.clone(),
            subject: grade.subject.clone(),
            grade: grade.grade,
            semester: grade.semester,
            remarks: grade.remarks.clone(),
            timestamp,
        }
    }
}

/// Target and reason of a logical delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePayload {
    pub record_id: RecordId,
    pub reason: String,
    pub timestamp: Timestamp,
}

/// A structured record-table mutation. Serialized with an `operation` field
/// of `"INSERT"` or `"DELETE"` alongside the variant's own fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "UPPERCASE")]
pub enum Operation {
    Insert(InsertPayload),
    Delete(DeletePayload),
}

/// Data snapshot carried by a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// A structured mutation, hashed in canonical JSON form.
    Operation(Operation),
    /// A literal string, hashed as-is. Genesis blocks carry
    /// [`GENESIS_MARKER`]; a stored payload that does not decode as an
    /// operation is also kept here verbatim.
    Marker(String),
}

impl Payload {
    pub fn genesis() -> Self {
        Payload::Marker(GENESIS_MARKER.to_string())
    }

    pub fn insert(payload: InsertPayload) -> Self {
        Payload::Operation(Operation::Insert(payload))
    }

    pub fn delete(payload: DeletePayload) -> Self {
        Payload::Operation(Operation::Delete(payload))
    }

    /// The exact string that enters the block hash.
    pub fn canonical(&self) -> Result<String, CanonicalError> {
        match self {
            Payload::Operation(op) => to_canonical_string(op),
            Payload::Marker(s) => Ok(s.clone()),
        }
    }

    /// Decode a payload from its persisted canonical form.
    ///
    /// The typed form is only used if it re-encodes to exactly `raw`. Any
    /// other string, including one with fields the operation does not
    /// declare, is kept verbatim so the hash covers every stored byte.
    pub fn from_canonical(raw: &str) -> Self {
        match serde_json::from_str::<Operation>(raw) {
            Ok(op) if to_canonical_string(&op).is_ok_and(|c| c == raw) => Payload::Operation(op),
            _ => Payload::Marker(raw.to_string()),
        }
    }

    /// Record targeted by this payload, if any.
    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            Payload::Operation(Operation::Insert(p)) => Some(p.record_id),
            Payload::Operation(Operation::Delete(p)) => Some(p.record_id),
            Payload::Marker(_) => None,
        }
    }
}

/// Human-readable label of a block. Descriptive only; not hashed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationTag {
    /// `INIT_DB`
    Genesis,
    /// `INSERT ID:<id>`
    Insert(RecordId),
    /// `DELETE ID:<id>`
    Delete(RecordId),
    /// Any other label read back from storage.
    Other(String),
}

impl fmt::Display for OperationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationTag::Genesis => f.write_str("INIT_DB"),
            OperationTag::Insert(id) => write!(f, "INSERT ID:{id}"),
            OperationTag::Delete(id) => write!(f, "DELETE ID:{id}"),
            OperationTag::Other(s) => f.write_str(s),
        }
    }
}

impl FromStr for OperationTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "INIT_DB" {
            return Ok(OperationTag::Genesis);
        }
        let parsed = if let Some(id) = s.strip_prefix("INSERT ID:") {
            id.parse().ok().map(OperationTag::Insert)
        } else if let Some(id) = s.strip_prefix("DELETE ID:") {
            id.parse().ok().map(OperationTag::Delete)
        } else {
            None
        };
        Ok(parsed.unwrap_or_else(|| OperationTag::Other(s.to_string())))
    }
}

impl Serialize for OperationTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One entry of the hash chain.
///
/// Blocks are only created by [`Block::seal`] (which computes the hash) or
/// decoded from storage by [`Block::from_row`]; fields are read-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Block {
    index: u64,
    timestamp: Timestamp,
    payload: Payload,
    previous_hash: String,
    hash: String,
    operation_tag: OperationTag,
}

impl Block {
    /// Build a block and compute its hash.
    pub fn seal(
        index: u64,
        timestamp: Timestamp,
        payload: Payload,
        previous_hash: String,
        operation_tag: OperationTag,
    ) -> Result<Self, CanonicalError> {
        let canonical = payload.canonical()?;
        let hash = BlockHasher::digest(index, timestamp.as_str(), &canonical, &previous_hash);
        Ok(Self {
            index,
            timestamp,
            payload,
            previous_hash,
            hash,
            operation_tag,
        })
    }

    /// The genesis block for a fresh chain.
    pub fn genesis(timestamp: Timestamp) -> Result<Self, CanonicalError> {
        Self::seal(
            0,
            timestamp,
            Payload::genesis(),
            GENESIS_PREVIOUS_HASH.to_string(),
            OperationTag::Genesis,
        )
    }

    /// Decode a persisted row. The stored hash is kept as-is so that
    /// verification can compare it against a recomputation.
    pub fn from_row(row: BlockRow) -> Self {
        let operation_tag = match row.operation_tag.parse::<OperationTag>() {
            Ok(tag) => tag,
            Err(never) => match never {},
        };
        Self {
            index: row.block_index,
            timestamp: Timestamp::from_raw(row.timestamp),
            payload: Payload::from_canonical(&row.payload),
            previous_hash: row.previous_hash,
            hash: row.block_hash,
            operation_tag,
        }
    }

    /// Encode for the block log.
    pub fn to_row(&self) -> Result<BlockRow, CanonicalError> {
        Ok(BlockRow {
            block_index: self.index,
            timestamp: self.timestamp.as_str().to_string(),
            payload: self.payload.canonical()?,
            previous_hash: self.previous_hash.clone(),
            block_hash: self.hash.clone(),
            operation_tag: self.operation_tag.to_string(),
        })
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn operation_tag(&self) -> &OperationTag {
        &self.operation_tag
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }

    /// Hash recomputed from the block's current contents.
    pub fn compute_hash(&self) -> Result<String, CanonicalError> {
        let canonical = self.payload.canonical()?;
        Ok(BlockHasher::digest(
            self.index,
            self.timestamp.as_str(),
            &canonical,
            &self.previous_hash,
        ))
    }

    #[cfg(test)]
    pub(crate) fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    #[cfg(test)]
    pub(crate) fn set_timestamp(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    #[cfg(test)]
    pub(crate) fn set_hash(&mut self, hash: String) {
        self.hash = hash;
    }
}

impl HashLinked for Block {
    fn stored_hash(&self) -> &str {
        &self.hash
    }

    fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    fn recompute_hash(&self) -> Option<String> {
        self.compute_hash().ok()
    }
}
