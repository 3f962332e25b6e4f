use regex::Regex;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::CodeFormatError;

static FILTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]+)(?:-(\d+[A-Za-z]?)(?:-(\d+))?)?$").unwrap()
});

/// `SUBJECT-NUMBER-SECTION`, e.g. `MAT-241-001` or `PHY-101L-002`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionCode {
    pub subject: String,
    pub number: String,
    pub section: String,
}

impl SectionCode {
    pub fn new(subject: &str, number: &str, section: &str) -> Self {
        SectionCode {
            subject: subject.to_ascii_uppercase(),
            number: number.to_ascii_uppercase(),
            section: section.into(),
        }
    }

    /// Leading digit run of the course number; `101L` compares as 101.
    pub fn course_number(&self) -> u32 {
        leading_number(&self.number)
    }
}

fn leading_number(s: &str) -> u32 {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(s.len(), |(i, _)| i);
    let digits = &s[..end];
    if digits.is_empty() {
        return 0;
    }
    // All digits, so the only parse failure is overflow
    digits.parse().unwrap_or(u32::MAX)
}

impl Ord for SectionCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.subject
            .cmp(&other.subject)
            .then_with(|| self.course_number().cmp(&other.course_number()))
            .then_with(|| self.number.cmp(&other.number))
            .then_with(|| self.section.cmp(&other.section))
    }
}

impl PartialOrd for SectionCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.subject, self.number, self.section)
    }
}

impl Serialize for SectionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Seats filled out of seats offered. Absent on a section means the portal
/// did not report it, which is not the same as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Enrollment {
    pub enrolled: u32,
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub code: SectionCode,
    pub title: String,
    pub instructor: String,
    pub term_dates: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub meeting: String,
    pub location: String,
    pub enrollment: Option<Enrollment>,
    pub credits: String,
    pub status: String,
    pub description: Vec<String>,
}

impl Section {
    pub fn new(code: SectionCode) -> Self {
        Section {
            code,
            title: String::new(),
            instructor: String::new(),
            term_dates: String::new(),
            kind: String::new(),
            meeting: String::new(),
            location: String::new(),
            enrollment: None,
            credits: String::new(),
            status: String::new(),
            description: Vec::new(),
        }
    }
}

/// One row of the portal's search form: a subject, optionally narrowed to a
/// course number and a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseFilter {
    pub subject: String,
    pub number: Option<String>,
    pub section: Option<String>,
}

impl FromStr for CourseFilter {
    type Err = CodeFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = FILTER_RE
            .captures(s.trim())
            .ok_or_else(|| CodeFormatError { input: s.into() })?;
        Ok(CourseFilter {
            subject: caps[1].to_ascii_uppercase(),
            number: caps.get(2).map(|m| m.as_str().to_ascii_uppercase()),
            section: caps.get(3).map(|m| m.as_str().into()),
        })
    }
}

impl fmt::Display for CourseFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.subject)?;
        if let Some(number) = &self.number {
            write!(f, "-{number}")?;
            if let Some(section) = &self.section {
                write!(f, "-{section}")?;
            }
        }
        Ok(())
    }
}
