use clap::{ArgGroup, Parser};

use wa::error::CodeFormatError;
use wa::format::DEFAULT_FIELDS;
use wa::{CourseFilter, CourseNumberRange, Field, FieldSet, Query, Sites};

/// Looked up in the working directory with any extension `config` reads.
const DEFAULT_SITE_FILE: &str = "wa";

#[derive(Debug, Parser)]
#[command(
    name = "wa",
    version,
    about = "Command-line front end for WebAdvisor section search",
    after_help = "Without field flags, prints section code, title and faculty. \
                  Output is unsorted; pipe through sort(1) if you need order."
)]
#[command(group(ArgGroup::new("bound").args(["greater", "less"])))]
pub struct Args {
    /// Sections to search for: SUBJECT, SUBJECT-NUMBER or SUBJECT-NUMBER-SECTION
    #[arg(required = true, value_name = "SEC")]
    pub sec: Vec<String>,

    /// Only report sections with course number >= N
    #[arg(short, long, value_name = "N")]
    pub greater: Option<u32>,

    /// Only report sections with course number <= N
    #[arg(short, long, value_name = "N")]
    pub less: Option<u32>,

    /// Term to search, e.g. SP16R [default: the site's default term]
    #[arg(short = 'r', long)]
    pub term: Option<String>,

    /// Site key from the site file
    #[arg(short = 'u', long = "url", value_name = "SITE")]
    pub site: Option<String>,

    /// Site file [default: ./wa.toml]
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Print each section as a JSON object instead of selected fields
    #[arg(long)]
    pub json: bool,

    /// Section code
    #[arg(short = 's', long)]
    pub section: bool,

    /// Course title
    #[arg(short = 't', long)]
    pub title: bool,

    /// Instructor
    #[arg(short = 'f', long)]
    pub faculty: bool,

    /// Start and end dates
    #[arg(short = 'd', long)]
    pub dates: bool,

    /// Meeting type (Lecture, Lab, ...)
    #[arg(short = 'y', long = "type")]
    pub kind: bool,

    /// Meeting days and times
    #[arg(short = 'm', long)]
    pub meeting: bool,

    /// Building and room
    #[arg(short = 'o', long)]
    pub location: bool,

    /// Enrolled / capacity
    #[arg(short = 'c', long)]
    pub capacity: bool,

    /// Minimum credits
    #[arg(short = 'k', long)]
    pub credits: bool,

    /// Open, Closed, ...
    #[arg(short = 'a', long)]
    pub status: bool,

    /// Course description, on the lines after each section
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Args {
    pub fn query(&self) -> Result<Query, CodeFormatError> {
        Ok(Query {
            filters: self
                .sec
                .iter()
                .map(|s| s.parse::<CourseFilter>())
                .collect::<Result<_, _>>()?,
            term: self.term.clone(),
            range: CourseNumberRange {
                min: self.greater.unwrap_or(0),
                max: self.less,
            },
            fields: self.fields(),
        })
    }

    fn fields(&self) -> FieldSet {
        let flags = [
            (self.section, Field::Code),
            (self.title, Field::Title),
            (self.faculty, Field::Instructor),
            (self.dates, Field::TermDates),
            (self.kind, Field::Type),
            (self.meeting, Field::Meeting),
            (self.location, Field::Location),
            (self.capacity, Field::Enrollment),
            (self.credits, Field::Credits),
            (self.status, Field::Status),
        ];
        let mut fields: FieldSet = flags
            .iter()
            .filter(|(on, _)| *on)
            .map(|&(_, field)| field)
            .collect();
        if fields.is_empty() {
            fields.extend(DEFAULT_FIELDS);
        }
        if self.verbose {
            fields.insert(Field::Description);
        }
        fields
    }

    pub fn sites(&self) -> Result<Sites, config::ConfigError> {
        match &self.config {
            Some(path) => Sites::load(path, true),
            None => Sites::load(DEFAULT_SITE_FILE, false),
        }
    }
}
