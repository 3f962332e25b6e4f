use crate::error::ParseError;
use crate::structs::*;

use log::{debug, info, warn};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

// Element id labels on a WebAdvisor results page. Ids carry a row suffix,
// e.g. `SEC_SHORT_TITLE_3`.
const SHORT_TITLE: &str = "SEC_SHORT_TITLE";
const STATUS: &str = "LIST_VAR1";
const FACULTY: &str = "SEC_FACULTY_INFO";
const ENROLLMENT: &str = "LIST_VAR5";
const CREDITS: &str = "SEC_MIN_CRED";
const START_DATE: &str = "DATE_LIST_VAR1";
const END_DATE: &str = "DATE_LIST_VAR2";
const MEETING_INFO: &str = "SEC_MEETING_INFO";
const MEETING_DAYS: &str = "SEC_MEETING_DAYS";
const MEETING_TIMES: &str = "SEC_MEETING_TIMES";
const MEETING_TYPE: &str = "SEC_INSTR_METHOD";
const LOCATION: &str = "SEC_LOCATION";
const DESCRIPTION: &str = "VAR3";

const DETAIL_LABELS: [&str; 4] = [MEETING_DAYS, MEETING_TIMES, MEETING_TYPE, LOCATION];

static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static ID_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[id]").unwrap());
static ERROR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.errorText").unwrap());

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+)-(\d+[A-Za-z]?)-(\d+)\b").unwrap());
static SYNONYM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\(\d+\)\s*").unwrap());
static ENROLLMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*/\s*(\d+)$").unwrap());
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9]*(?:\s[^<>]*)?/?>").unwrap());

/// What a single table row contributes to a section.
#[derive(Debug, Clone, Copy)]
enum Row<'a> {
    /// Opens a section: code, title, instructor, counts
    Summary(ElementRef<'a>),
    /// One meeting pattern of the current section
    Detail(ElementRef<'a>),
    Description(ElementRef<'a>),
    Unrecognized,
}

/// A summary row and every row up to the next summary row.
#[derive(Debug)]
struct Group<'a> {
    summary: ElementRef<'a>,
    details: Vec<ElementRef<'a>>,
    descriptions: Vec<ElementRef<'a>>,
}

/// Parses a section search results page into sections, in page order.
pub fn parse(raw_html: &str) -> Result<Vec<Section>, ParseError> {
    let doc = Html::parse_document(raw_html);

    // Layout tables wrap the results table, so only rows without nested rows
    // describe a single thing.
    let rows = doc
        .select(&ROW_SEL)
        .filter(|tr| tr.select(&ROW_SEL).next().is_none())
        .map(classify);
    let groups = group_rows(rows);

    let mut seen = HashSet::new();
    let mut sections = Vec::with_capacity(groups.len());
    for group in &groups {
        let Some(section) = extract(group) else {
            debug!("skipping row group without a section code");
            continue;
        };
        if !seen.insert(section.code.clone()) {
            warn!("skipping repeated section {}", section.code);
            continue;
        }
        sections.push(section);
    }

    if sections.is_empty() {
        return Err(ParseError::NoSectionsFound {
            message: portal_message(&doc),
        });
    }

    info!("parsed {} sections from {} row groups", sections.len(), groups.len());
    Ok(sections)
}

fn classify(row: ElementRef) -> Row {
    let has = |label: &str| find_labeled(row, label).is_some();

    if has(SHORT_TITLE) {
        Row::Summary(row)
    } else if DETAIL_LABELS.iter().any(|&label| has(label)) {
        Row::Detail(row)
    } else if has(DESCRIPTION) {
        Row::Description(row)
    } else {
        Row::Unrecognized
    }
}

fn group_rows<'a>(rows: impl Iterator<Item = Row<'a>>) -> Vec<Group<'a>> {
    let mut groups: Vec<Group> = Vec::new();

    for row in rows {
        if let Row::Summary(summary) = row {
            groups.push(Group {
                summary,
                details: Vec::new(),
                descriptions: Vec::new(),
            });
            continue;
        }
        let Some(group) = groups.last_mut() else {
            if !matches!(row, Row::Unrecognized) {
                debug!("ignoring section row before the first summary row");
            }
            continue;
        };
        match row {
            Row::Detail(detail) => group.details.push(detail),
            Row::Description(desc) => group.descriptions.push(desc),
            Row::Summary(_) | Row::Unrecognized => {}
        }
    }

    groups
}

fn extract(group: &Group) -> Option<Section> {
    let summary = group.summary;
    let (code, title) = parse_short_title(&text_of(find_labeled(summary, SHORT_TITLE)?))?;

    let mut section = Section::new(code);
    section.title = title;
    section.status = labeled_text(summary, STATUS);
    section.instructor = labeled_text(summary, FACULTY);
    section.credits = labeled_text(summary, CREDITS);
    section.enrollment = parse_enrollment(&labeled_text(summary, ENROLLMENT));
    section.term_dates = date_range(
        &labeled_text(summary, START_DATE),
        &labeled_text(summary, END_DATE),
    );

    let mut meetings = Vec::new();
    let mut kinds = Vec::new();
    let mut locations = Vec::new();
    if let Some(info) = find_labeled(summary, MEETING_INFO) {
        meetings.extend(block_lines(info));
    }
    for &detail in &group.details {
        let days = labeled_text(detail, MEETING_DAYS);
        let times = labeled_text(detail, MEETING_TIMES);
        meetings.push(format!("{days} {times}").trim().to_string());
        kinds.push(labeled_text(detail, MEETING_TYPE));
        locations.push(labeled_text(detail, LOCATION));
    }
    section.meeting = join_nonempty(&meetings);
    section.kind = join_nonempty(&kinds);
    section.location = join_nonempty(&locations);

    let mut description = String::new();
    for desc in group.descriptions.iter().filter_map(|&row| find_labeled(row, DESCRIPTION)) {
        collect_text(desc, &mut description);
        description.push('\n');
    }
    section.description = tidy_lines(&description);

    Some(section)
}

/// `MAT-241-001 (12345) Proof and Logic` into its code and title.
fn parse_short_title(text: &str) -> Option<(SectionCode, String)> {
    let caps = CODE_RE.captures(text)?;
    let code = SectionCode::new(&caps[1], &caps[2], &caps[3]);
    let rest = text[caps[0].len()..].trim_start();
    let title = SYNONYM_RE.replace(rest, "").trim().to_string();
    Some((code, title))
}

fn parse_enrollment(cell: &str) -> Option<Enrollment> {
    let caps = ENROLLMENT_RE.captures(cell)?;
    Some(Enrollment {
        enrolled: caps[1].parse().ok()?,
        capacity: caps[2].parse().ok()?,
    })
}

fn date_range(start: &str, end: &str) -> String {
    match (start.is_empty(), end.is_empty()) {
        (false, false) => format!("{start}-{end}"),
        (false, true) => start.into(),
        _ => end.into(),
    }
}

fn join_nonempty(values: &[String]) -> String {
    values
        .iter()
        .filter(|v| !v.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether an element id is `label` or `label_<row>`. A plain prefix test
/// would let `LIST_VAR1` match `LIST_VAR12_1`.
fn has_label(id: &str, label: &str) -> bool {
    match id.strip_prefix(label) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('_')
            .is_some_and(|row| !row.is_empty() && row.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}

fn find_labeled<'a>(scope: ElementRef<'a>, label: &str) -> Option<ElementRef<'a>> {
    scope
        .select(&ID_SEL)
        .find(|el| el.value().id().is_some_and(|id| has_label(id, label)))
}

fn labeled_text(scope: ElementRef, label: &str) -> String {
    find_labeled(scope, label).map(text_of).unwrap_or_default()
}

fn text_of(el: ElementRef) -> String {
    el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Text of `el` split where the markup breaks lines.
fn block_lines(el: ElementRef) -> Vec<String> {
    let mut raw = String::new();
    collect_text(el, &mut raw);
    tidy_lines(&raw)
}

fn collect_text(el: ElementRef, out: &mut String) {
    for child in el.children() {
        match child.value() {
            // Source newlines are layout, not content
            Node::Text(text) => out.extend(text.chars().map(|c| if c == '\n' { ' ' } else { c })),
            Node::Element(child_el) => {
                let name = child_el.name();
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let block = matches!(name, "p" | "div" | "li" | "tr");
                if block {
                    out.push('\n');
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Collapses whitespace per line, drops tag debris, trims blank lines at
/// both ends and squeezes runs of blank lines to one.
fn tidy_lines(raw: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for line in raw.split('\n') {
        let line = TAG_RE.replace_all(line, "");
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() && lines.last().map_or(true, String::is_empty) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }

    lines
}

/// The portal's own error banner, if the page shows one.
pub(crate) fn portal_message(doc: &Html) -> Option<String> {
    doc.select(&ERROR_SEL)
        .map(text_of)
        .find(|message| !message.is_empty())
}
