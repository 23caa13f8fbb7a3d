use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use gl_types::{GradeRecord, NewGrade, RecordId, RecordUpdate};

use crate::error::{StoreError, StoreResult};
use crate::memory::{poisoned, RecordTable};
use crate::row::BlockRow;
use crate::traits::{LedgerStore, RecordStore};

/// On-disk layout of the record table.
#[derive(Serialize, Deserialize)]
struct RecordFile {
    last_id: u64,
    records: Vec<GradeRecord>,
}

impl From<&RecordTable> for RecordFile {
    fn from(table: &RecordTable) -> Self {
        Self {
            last_id: table.last_id,
            records: table.records.values().cloned().collect(),
        }
    }
}

impl From<RecordFile> for RecordTable {
    fn from(file: RecordFile) -> Self {
        Self {
            last_id: file.last_id,
            records: file.records.into_iter().map(|r| (r.id, r)).collect(),
        }
    }
}

/// Record table persisted as a single JSON document.
///
/// The table is held in memory and the whole document is rewritten on every
/// mutation: written to a temporary file in the same directory, then renamed
/// over the previous version, so a crash leaves either the old or the new
/// table on disk, never a torn one.
pub struct JsonFileRecordStore {
    path: PathBuf,
    sync_every_write: bool,
    table: RwLock<RecordTable>,
}

impl JsonFileRecordStore {
    /// Open (or create) the record table at `path`.
    pub fn open(path: &Path, sync_every_write: bool) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let table = if path.exists() {
            let data = fs::read_to_string(path)?;
            if data.trim().is_empty() {
                RecordTable::default()
            } else {
                let file: RecordFile =
                    serde_json::from_str(&data).map_err(|e| StoreError::Corrupt {
                        path: path.to_path_buf(),
                        line: e.line(),
                        reason: e.to_string(),
                    })?;
                RecordTable::from(file)
            }
        } else {
            RecordTable::default()
        };

        debug!(path = %path.display(), records = table.records.len(), "record table opened");

        Ok(Self {
            path: path.to_path_buf(),
            sync_every_write,
            table: RwLock::new(table),
        })
    }

    /// Path to the table document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, table: &RecordTable) -> StoreResult<()> {
        let encoded = serde_json::to_vec_pretty(&RecordFile::from(table))
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&encoded)?;
        if self.sync_every_write {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    /// Run a mutation against a copy of the table and only adopt it once the
    /// new document is on disk.
    fn mutate<T>(&self, f: impl FnOnce(&mut RecordTable) -> StoreResult<T>) -> StoreResult<T> {
        let mut table = self.table.write().map_err(|_| poisoned())?;
        let mut next = table.clone();
        let out = f(&mut next)?;
        self.persist(&next)?;
        *table = next;
        Ok(out)
    }
}

impl RecordStore for JsonFileRecordStore {
    fn insert_record(&self, grade: &NewGrade) -> StoreResult<RecordId> {
        self.mutate(|table| Ok(table.insert(grade)))
    }

    fn update_record(&self, id: RecordId, update: &RecordUpdate) -> StoreResult<()> {
        self.mutate(|table| table.update(id, update))
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
        self.mutate(|table| {
            table.clear();
            Ok(())
        })
    }
}

/// File the block log appends to.
trait LogFile: Write {
    /// Current length in bytes.
    fn end(&mut self) -> io::Result<u64>;
    /// Cut the file back to `len` bytes.
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl LogFile for File {
    fn end(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Append one whole line, or nothing.
///
/// On any failure the file is cut back to its previous length, so a retry
/// of the same row cannot leave a partial or duplicate line behind.
fn append_line<F: LogFile>(file: &mut F, line: &[u8], sync: bool) -> io::Result<()> {
    let start = file.end()?;
    let mut written = file.write_all(line).and_then(|()| file.flush());
    if written.is_ok() && sync {
        written = file.sync();
    }
    if let Err(e) = written {
        if let Err(undo) = file.truncate(start) {
            warn!(error = %undo, len = start, "failed to roll back partial block row");
        }
        return Err(e);
    }
    Ok(())
}

/// Internal mutable state for the block log writer.
struct LogWriter {
    file: File,
    indices: HashSet<u64>,
}

/// Append-only block log, one JSON-encoded [`BlockRow`] per line.
///
/// Each row is written unbuffered as a single line. Rows are only ever
/// appended; `delete_all` truncates the file.
pub struct JsonlLedgerStore {
    path: PathBuf,
    sync_every_write: bool,
    writer: Mutex<LogWriter>,
}

impl JsonlLedgerStore {
    /// Open (or create) the block log at `path`.
    pub fn open(path: &Path, sync_every_write: bool) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let indices = read_rows(path)?.into_iter().map(|r| r.block_index).collect();

        Ok(Self {
            path: path.to_path_buf(),
            sync_every_write,
            writer: Mutex::new(LogWriter { file, indices }),
        })
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for JsonlLedgerStore {
    fn append_block(&self, row: &BlockRow) -> StoreResult<()> {
        let mut line =
            serde_json::to_vec(row).map_err(|e| StoreError::Serialization(e.to_string()))?;
        line.push(b'\n');

        let mut w = self.writer.lock().map_err(|_| poisoned())?;
        if w.indices.contains(&row.block_index) {
            return Err(StoreError::Conflict {
                index: row.block_index,
            });
        }

        append_line(&mut w.file, &line, self.sync_every_write)?;
        w.indices.insert(row.block_index);

        debug!(index = row.block_index, len = line.len(), "block row appended");
        Ok(())
    }

    fn load_all(&self) -> StoreResult<Vec<BlockRow>> {
        // Hold the writer lock so a concurrent append cannot interleave.
        let _w = self.writer.lock().map_err(|_| poisoned())?;
        let mut rows = read_rows(&self.path)?;
        rows.sort_by_key(|r| r.block_index);
        Ok(rows)
    }

    fn delete_all(&self) -> StoreResult<()> {
        let mut w = self.writer.lock().map_err(|_| poisoned())?;

        OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        let file = OpenOptions::new().append(true).open(&self.path)?;

        w.file = file;
        w.indices.clear();

        debug!(path = %self.path.display(), "block log truncated");
        Ok(())
    }
}

fn read_rows(path: &Path) -> StoreResult<Vec<BlockRow>> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: BlockRow = serde_json::from_str(&line).map_err(|e| StoreError::Corrupt {
            path: path.to_path_buf(),
            line: n + 1,
            reason: e.to_string(),
        })?;
        rows.push(row);
    }
    Ok(rows)
}
