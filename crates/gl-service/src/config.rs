use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Service configuration, read from a TOML file. Missing keys take their
/// defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Directory holding both data files.
    pub data_dir: PathBuf,
    /// Record table document, relative to `data_dir`.
    pub records_file: String,
    /// Block log, relative to `data_dir`.
    pub ledger_file: String,
    /// fsync after every write.
    pub sync_every_write: bool,
    /// Reason recorded when a delete is requested without one.
    pub default_delete_reason: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            records_file: "grades.json".into(),
            ledger_file: "ledger.jsonl".into(),
            sync_every_write: false,
            default_delete_reason: "Deleted by user".into(),
        }
    }
}

impl ServiceConfig {
    /// Load a config file.
    pub fn load(path: &Path) -> ServiceResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| ServiceError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&text).map_err(|reason| ServiceError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    pub fn records_path(&self) -> PathBuf {
        self.data_dir.join(&self.records_file)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }
}
