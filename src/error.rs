//! Error types for every stage of a run.

use reqwest::StatusCode;
use thiserror::Error;

/// Failures while talking to the portal.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No site with this key in the site configuration
    #[error("unknown site '{site}'")]
    SiteUnresolved { site: String },

    /// Transport failure: DNS, TLS, refused connection, timeout
    #[error("connection failed: {0}")]
    ConnectionFailed(#[from] reqwest::Error),

    #[error("authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: StatusCode, url: String },

    /// A page in the session flow lacked the link, token or form we follow
    #[error("portal navigation failed: missing {what}")]
    Navigation { what: String },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no sections found{}", .message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    NoSectionsFound { message: Option<String> },
}

#[derive(Debug, Error)]
#[error("invalid course code '{input}', expected SUBJECT, SUBJECT-NUMBER or SUBJECT-NUMBER-SECTION")]
pub struct CodeFormatError {
    pub input: String,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    InvalidCourseCodeFormat(#[from] CodeFormatError),

    #[error("could not encode section: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
