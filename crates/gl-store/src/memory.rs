use std::collections::BTreeMap;
use std::sync::RwLock;

use gl_types::{GradeRecord, NewGrade, RecordId, RecordUpdate};

use crate::error::{StoreError, StoreResult};
use crate::row::BlockRow;
use crate::traits::{LedgerStore, RecordStore};

/// Record table contents shared by the in-memory and file-backed stores.
#[derive(Clone, Debug, Default)]
pub(crate) struct RecordTable {
    /// Last identifier handed out; 0 before the first insert.
    pub(crate) last_id: u64,
    pub(crate) records: BTreeMap<RecordId, GradeRecord>,
}

impl RecordTable {
    pub(crate) fn insert(&mut self, grade: &NewGrade) -> RecordId {
        self.last_id += 1;
        let id = RecordId::new(self.last_id);
        self.records.insert(id, GradeRecord::from_new(id, grade));
        id
    }

    pub(crate) fn update(&mut self, id: RecordId, update: &RecordUpdate) -> StoreResult<()> {
        let record = self.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.apply(update);
        Ok(())
    }

    pub(crate) fn active(&self) -> Vec<GradeRecord> {
        self.records.values().filter(|r| r.active).cloned().collect()
    }

    pub(crate) fn by_id(&self, id: RecordId) -> Vec<GradeRecord> {
        self.records.get(&id).cloned().into_iter().collect()
    }

    /// Drop every record. The identifier counter keeps running.
    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }
}

pub(crate) fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".into())
}

/// In-memory record table.
///
/// Intended for tests and embedding. Records are held behind a `RwLock` for
/// safe concurrent access and cloned on read.
#[derive(Default)]
pub struct InMemoryRecordStore {
    table: RwLock<RecordTable>,
}

impl InMemoryRecordStore {
    /// Create a new empty record table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, active or not.
    pub fn len(&self) -> StoreResult<usize> {
        let table = self.table.read().map_err(|_| poisoned())?;
        Ok(table.records.len())
    }

    /// Returns `true` if no record is held.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert_record(&self, grade: &NewGrade) -> StoreResult<RecordId> {
        let mut table = self.table.write().map_err(|_| poisoned())?;
        Ok(table.insert(grade))
    }

    fn update_record(&self, id: RecordId, update: &RecordUpdate) -> StoreResult<()> {
        let mut table = self.table.write().map_err(|_| poisoned())?;
        table.update(id, update)
    }

    fn query_active(&self) -> StoreResult<Vec<GradeRecord>> {
        let table = self.table.read().map_err(|_| poisoned())?;
        Ok(table.active())
    }

    fn query_by_id(&self, id: RecordId) -> StoreResult<Vec<GradeRecord>> {
        let table = self.table.read().map_err(|_| poisoned())?;
        Ok(table.by_id(id))
    }

    fn delete_all(&self) -> StoreResult<()> {
        let mut table = self.table.write().map_err(|_| poisoned())?;
        table.clear();
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRecordStore")
            .field("record_count", &self.len().ok())
            .finish()
    }
}

/// In-memory block log, keyed by block index.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    rows: RwLock<BTreeMap<u64, BlockRow>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted rows.
    pub fn len(&self) -> StoreResult<usize> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append_block(&self, row: &BlockRow) -> StoreResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if rows.contains_key(&row.block_index) {
            return Err(StoreError::Conflict {
                index: row.block_index,
            });
        }
        rows.insert(row.block_index, row.clone());
        Ok(())
    }

    fn load_all(&self) -> StoreResult<Vec<BlockRow>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.values().cloned().collect())
    }

    fn delete_all(&self) -> StoreResult<()> {
        self.rows.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedgerStore")
            .field("row_count", &self.len().ok())
            .finish()
    }
}
