use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown grade: {0}")]
    InvalidGrade(String),

    #[error("unknown semester: {0}")]
    InvalidSemester(String),

    #[error("invalid record id: {0}")]
    InvalidRecordId(String),
}
