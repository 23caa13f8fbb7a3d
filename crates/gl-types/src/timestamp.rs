use std::fmt;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format of every timestamp the ledger produces: UTC, microsecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Wall-clock capture instant in the exact string form that gets hashed.
///
/// The string is kept verbatim rather than re-rendered from a parsed value,
/// so a block loaded from storage hashes over the same bytes it was written
/// with.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Capture the current UTC time.
    pub fn now() -> Self {
        Self(Utc::now().format(TIMESTAMP_FORMAT).to_string())
    }

    /// Wrap a timestamp string read back from storage.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the string form, if it is in the ledger's own format.
    pub fn parse(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.0, TIMESTAMP_FORMAT).ok()
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
