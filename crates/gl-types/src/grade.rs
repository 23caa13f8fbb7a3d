use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Letter grade on the institution's scale.
///
/// Variants are declared best-first, so the derived ordering sorts `A+`
/// before `F`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "F")]
    F,
}

impl Grade {
    /// Every grade, best first.
    pub const ALL: [Grade; 8] = [
        Grade::APlus,
        Grade::A,
        Grade::BPlus,
        Grade::B,
        Grade::CPlus,
        Grade::C,
        Grade::D,
        Grade::F,
    ];

    /// Grade points used for GPA computation.
    pub fn points(&self) -> f64 {
        match self {
            Grade::APlus | Grade::A => 4.0,
            Grade::BPlus => 3.3,
            Grade::B => 3.0,
            Grade::CPlus => 2.3,
            Grade::C => 2.0,
            Grade::D => 1.0,
            Grade::F => 0.0,
        }
    }

    /// Returns `true` for every grade except `F`.
    pub fn is_passing(&self) -> bool {
        !matches!(self, Grade::F)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Grade::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| TypeError::InvalidGrade(s.to_string()))
    }
}

/// Academic term a grade was earned in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Semester {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Semester {
    pub const ALL: [Semester; 4] = [
        Semester::Spring,
        Semester::Summer,
        Semester::Fall,
        Semester::Winter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::Spring => "Spring",
            Semester::Summer => "Summer",
            Semester::Fall => "Fall",
            Semester::Winter => "Winter",
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Semester {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Semester::ALL
            .into_iter()
            .find(|sem| sem.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| TypeError::InvalidSemester(s.to_string()))
    }
}
