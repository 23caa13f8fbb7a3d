//! Read-only aggregates over active grade records.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use gl_types::{Grade, GradeRecord};

/// Per-student overview.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StudentSummary {
    pub student_id: String,
    /// Name on the most recent record.
    pub student_name: String,
    pub record_count: usize,
    /// Distinct subjects with at least one active record.
    pub subject_count: usize,
    /// Most frequent grade; ties go to the better grade.
    pub most_common_grade: Grade,
    /// Mean grade points.
    pub gpa: f64,
    /// Percentage of passing grades, 0 to 100.
    pub pass_rate: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GradeCount {
    pub grade: Grade,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubjectCount {
    pub subject: String,
    pub count: usize,
}

/// Summarize one student's records. `None` if the slice is empty.
pub fn student_summary(student_id: &str, records: &[GradeRecord]) -> Option<StudentSummary> {
    let latest = records.iter().max_by_key(|r| r.id)?;
    let total = records.len();

    let subjects: BTreeSet<&str> = records.iter().map(|r| r.subject.as_str()).collect();

    // Walked worst grade first: `max_by_key` keeps the last of equal maxima.
    let counts = count_grades(records);
    let most_common_grade = counts
        .iter()
        .rev()
        .max_by_key(|(_, n)| **n)
        .map(|(g, _)| *g)?;

    let points: f64 = records.iter().map(|r| r.grade.points()).sum();
    let passing = records.iter().filter(|r| r.grade.is_passing()).count();

    Some(StudentSummary {
        student_id: student_id.to_string(),
        student_name: latest.student_name.clone(),
        record_count: total,
        subject_count: subjects.len(),
        most_common_grade,
        gpa: points / total as f64,
        pass_rate: passing as f64 * 100.0 / total as f64,
    })
}

/// Count of each grade present, best grade first.
pub fn grade_distribution(records: &[GradeRecord]) -> Vec<GradeCount> {
    count_grades(records)
        .into_iter()
        .map(|(grade, count)| GradeCount { grade, count })
        .collect()
}

/// Count of records per subject, ordered by subject name.
pub fn subject_distribution(records: &[GradeRecord]) -> Vec<SubjectCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.subject.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(subject, count)| SubjectCount {
            subject: subject.to_string(),
            count,
        })
        .collect()
}

fn count_grades(records: &[GradeRecord]) -> BTreeMap<Grade, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.grade).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use gl_types::{NewGrade, RecordId, Semester};

    fn record(id: u64, subject: &str, grade: Grade) -> GradeRecord {
        GradeRecord::from_new(
            RecordId::new(id),
            &NewGrade::new("Alice", "S1", subject, grade, Semester::Fall, ""),
        )
    }

    #[test]
    fn empty_student_has_no_summary() {
        assert!(student_summary("S1", &[]).is_none());
    }

    #[test]
    fn summary_figures() {
        let records = vec![
            record(1, "Math", Grade::A),
            record(2, "Physics", Grade::B),
            record(3, "Math", Grade::F),
            record(4, "Art", Grade::B),
        ];
        let s = student_summary("S1", &records).unwrap();
        assert_eq!(s.record_count, 4);
        assert_eq!(s.subject_count, 3);
        assert_eq!(s.most_common_grade, Grade::B);
        assert!((s.gpa - 2.5).abs() < 1e-9);
        assert!((s.pass_rate - 75.0).abs() < 1e-9);
    }

    #[test]
    fn most_common_grade_tie_goes_to_better_grade() {
        let records = vec![
            record(1, "Math", Grade::C),
            record(2, "Art", Grade::BPlus),
            record(3, "Physics", Grade::C),
            record(4, "History", Grade::BPlus),
        ];
        let s = student_summary("S1", &records).unwrap();
        assert_eq!(s.most_common_grade, Grade::BPlus);
    }

    #[test]
    fn distributions_are_ordered() {
        let records = vec![
            record(1, "Physics", Grade::F),
            record(2, "Math", Grade::APlus),
            record(3, "Math", Grade::F),
        ];
        assert_eq!(
            grade_distribution(&records),
            vec![
                GradeCount { grade: Grade::APlus, count: 1 },
                GradeCount { grade: Grade::F, count: 2 },
            ]
        );
        let subjects = subject_distribution(&records);
        assert_eq!(subjects[0], SubjectCount { subject: "Math".into(), count: 2 });
        assert_eq!(subjects[1], SubjectCount { subject: "Physics".into(), count: 1 });
    }
}
