use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::grade::{Grade, Semester};

/// Identifier assigned to a grade record by the record store.
///
/// Identifiers start at 1 and are never reused, even after a reset.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for RecordId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u64>() {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(TypeError::InvalidRecordId(s.to_string())),
        }
    }
}

/// Fields submitted when recording a grade.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGrade {
    pub student_name: String,
    pub student_id: String,
    pub subject: String,
    pub grade: Grade,
    pub semester: Semester,
    #[serde(default)]
    pub remarks: String,
}

impl NewGrade {
    pub fn new(
        student_name: impl Into<String>,
        student_id: impl Into<String>,
        subject: impl Into<String>,
        grade: Grade,
        semester: Semester,
        remarks: impl Into<String>,
    ) -> Self {
        Self {
            student_name: student_name.into(),
            student_id: student_id.into(),
            subject: subject.into(),
            grade,
            semester,
            remarks: remarks.into(),
        }
    }
}

/// A grade record as held by the record store.
///
/// Deleted records stay in the store with `active == false`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub id: RecordId,
    pub student_name: String,
    pub student_id: String,
    pub subject: String,
    pub grade: Grade,
    pub semester: Semester,
    #[serde(default)]
    pub remarks: String,
    pub active: bool,
}

impl GradeRecord {
    /// Materialize a freshly inserted, active record.
    pub fn from_new(id: RecordId, grade: &NewGrade) -> Self {
        Self {
            id,
            student_name: grade.student_name.clone(),
            student_id: grade.student_id.clone(),
            subject: grade.subject.clone(),
            grade: grade.grade,
            semester: grade.semester,
            remarks: grade.remarks.clone(),
            active: true,
        }
    }

    /// Case-insensitive substring match over name, student id, and subject.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        [&self.student_name, &self.student_id, &self.subject]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, update: &RecordUpdate) {
        if let Some(active) = update.active {
            self.active = active;
        }
        if let Some(remarks) = &update.remarks {
            self.remarks = remarks.clone();
        }
    }
}

/// Partial update of a stored record. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub active: Option<bool>,
    pub remarks: Option<String>,
}

impl RecordUpdate {
    /// Update that flags a record inactive and annotates the deletion.
    pub fn logical_delete(reason: &str) -> Self {
        Self {
            active: Some(false),
            remarks: Some(format!("Deleted: {reason}")),
        }
    }
}
