//! High-level service for the Grade Ledger.
//!
//! [`GradeService`] is the entry point for applications: every grade
//! record mutation goes through it so that the record table and the
//! tamper-evidence ledger stay in step.

pub mod analytics;
pub mod config;
pub mod error;
pub mod service;

pub use analytics::{GradeCount, StudentSummary, SubjectCount};
pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use service::{FileGradeService, GradeService, InMemoryGradeService, Receipt};

// Re-export key types
pub use gl_ledger::{Block, LedgerStats, OperationTag, Payload, Verification, Violation, ViolationKind};
pub use gl_store::{LedgerStore, RecordStore};
pub use gl_types::{Grade, GradeRecord, NewGrade, RecordId, Semester};
