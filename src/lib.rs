//! Section search for Ellucian WebAdvisor portals: fetch a results page,
//! scrape it into [`Section`]s and print the fields you ask for, one line per
//! section.

pub mod error;
pub mod fetch;
pub mod format;
pub mod scrape;
pub mod site;
pub mod structs;

pub use error::{Error, Result};
pub use format::{CourseNumberRange, Field, FieldSet};
pub use site::{SiteConfig, Sites};
pub use structs::{CourseFilter, Enrollment, Section, SectionCode};

/// What to search for and what to print.
#[derive(Debug, Clone)]
pub struct Query {
    pub filters: Vec<CourseFilter>,
    /// Overrides the site's default term
    pub term: Option<String>,
    pub range: CourseNumberRange,
    pub fields: FieldSet,
}

/// Fetches and parses the sections matching `query` on `site`.
pub async fn sections(site: &SiteConfig, query: &Query) -> Result<Vec<Section>> {
    let html = fetch::fetch(site, &query.filters, query.term.as_deref()).await?;
    Ok(scrape::parse(&html)?)
}
