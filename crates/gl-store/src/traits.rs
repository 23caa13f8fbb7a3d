use gl_types::{GradeRecord, NewGrade, RecordId, RecordUpdate};

use crate::error::StoreResult;
use crate::row::BlockRow;

/// The grade record table.
///
/// All implementations must satisfy these invariants:
/// - `insert_record` assigns a fresh identifier; identifiers start at 1 and
///   are never reused, even after `delete_all`.
/// - Records are never physically removed except by `delete_all`; logical
///   deletion goes through `update_record`.
/// - Every query except `query_by_id` excludes inactive records.
pub trait RecordStore: Send + Sync {
    /// Insert a new active record and return its identifier.
    fn insert_record(&self, grade: &NewGrade) -> StoreResult<RecordId>;

    /// Apply a partial update to an existing record.
    ///
    /// Returns `StoreError::NotFound` if no record has this identifier.
    fn update_record(&self, id: RecordId, update: &RecordUpdate) -> StoreResult<()>;

    /// All active records, ordered by identifier.
    fn query_active(&self) -> StoreResult<Vec<GradeRecord>>;

    /// The record with this identifier, active or not. Zero or one entries.
    fn query_by_id(&self, id: RecordId) -> StoreResult<Vec<GradeRecord>>;

    /// Active records of one student, ordered by identifier.
    fn query_by_student(&self, student_id: &str) -> StoreResult<Vec<GradeRecord>> {
        Ok(self
            .query_active()?
            .into_iter()
            .filter(|r| r.student_id == student_id)
            .collect())
    }

    /// Remove every record. Used only by a ledger reset.
    fn delete_all(&self) -> StoreResult<()>;
}

/// Durable mirror of the hash chain.
///
/// All implementations must satisfy these invariants:
/// - Rows are never modified once appended.
/// - Appending a row whose index is already present fails with
///   `StoreError::Conflict`.
/// - `load_all` returns rows ordered by ascending index.
pub trait LedgerStore: Send + Sync {
    /// Persist one block row.
    fn append_block(&self, row: &BlockRow) -> StoreResult<()>;

    /// Every persisted row, ordered by ascending index.
    fn load_all(&self) -> StoreResult<Vec<BlockRow>>;

    /// Remove every row. Used only by a ledger reset.
    fn delete_all(&self) -> StoreResult<()>;
}
