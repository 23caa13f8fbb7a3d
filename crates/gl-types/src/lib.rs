//! Foundation types for the Grade Ledger.
//!
//! This crate provides the value types shared by every other crate in the
//! workspace: the grade record as held by the record store, the grade scale,
//! semesters, and the capture timestamps stamped onto ledger blocks.
//!
//! # Key Types
//!
//! - [`RecordId`] -- Store-assigned identifier of a grade record
//! - [`NewGrade`] -- Fields submitted when a grade is recorded
//! - [`GradeRecord`] -- A stored grade record, including its `active` flag
//! - [`Grade`] -- Letter grade on the `A+` .. `F` scale with grade points
//! - [`Semester`] -- Academic term
//! - [`Timestamp`] -- Wall-clock capture instant in its hashed string form

pub mod error;
pub mod grade;
pub mod record;
pub mod timestamp;

pub use error::TypeError;
pub use grade::{Grade, Semester};
pub use record::{GradeRecord, NewGrade, RecordId, RecordUpdate};
pub use timestamp::Timestamp;
