//! Rendering parsed sections as lines of text.

use std::collections::BTreeSet;

use crate::structs::{Enrollment, Section};

/// A section field that can be printed. Variant order is output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Code,
    Title,
    Instructor,
    TermDates,
    Type,
    Meeting,
    Location,
    Enrollment,
    Credits,
    Status,
    /// Printed on its own lines after the summary line
    Description,
}

pub type FieldSet = BTreeSet<Field>;

/// Printed when no single-line field is asked for.
pub const DEFAULT_FIELDS: [Field; 3] = [Field::Code, Field::Title, Field::Instructor];

/// Inclusive bounds on the numeric part of a course number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CourseNumberRange {
    pub min: u32,
    pub max: Option<u32>,
}

impl CourseNumberRange {
    pub fn at_least(min: u32) -> Self {
        CourseNumberRange { min, max: None }
    }

    pub fn at_most(max: u32) -> Self {
        CourseNumberRange { min: 0, max: Some(max) }
    }

    pub fn contains(&self, section: &Section) -> bool {
        let number = section.code.course_number();
        number >= self.min && self.max.map_or(true, |max| number <= max)
    }
}

/// One summary line per section in range, followed by its description lines
/// when [`Field::Description`] is requested. Sections keep their given order.
pub fn format(sections: &[Section], range: CourseNumberRange, fields: &FieldSet) -> Vec<String> {
    let mut lines = Vec::new();

    for section in sections.iter().filter(|s| range.contains(s)) {
        let summary = fields
            .iter()
            .filter_map(|&field| token(section, field))
            .collect::<Vec<_>>()
            .join(" ");
        let summary = summary.trim_end();
        if !summary.is_empty() {
            lines.push(summary.to_string());
        }
        if fields.contains(&Field::Description) {
            lines.extend(section.description.iter().cloned());
        }
    }

    lines
}

/// One JSON object per section in range.
pub fn format_json(
    sections: &[Section],
    range: CourseNumberRange,
) -> Result<Vec<String>, serde_json::Error> {
    sections
        .iter()
        .filter(|s| range.contains(s))
        .map(serde_json::to_string)
        .collect()
}

fn token(section: &Section, field: Field) -> Option<String> {
    let text = match field {
        Field::Code => section.code.to_string(),
        Field::Title => section.title.clone(),
        Field::Instructor => section.instructor.clone(),
        Field::TermDates => section.term_dates.clone(),
        Field::Type => section.kind.clone(),
        Field::Meeting => section.meeting.clone(),
        Field::Location => section.location.clone(),
        Field::Enrollment => return Some(enrollment(section.enrollment)),
        Field::Credits => section.credits.clone(),
        Field::Status => section.status.clone(),
        Field::Description => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn enrollment(counts: Option<Enrollment>) -> String {
    match counts {
        Some(Enrollment { enrolled, capacity }) => format!("{enrolled} / {capacity}"),
        None => "? / ?".into(),
    }
}
