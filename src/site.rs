//! Site configuration: which portal to talk to and how.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::FetchError;

/// Connection parameters for one WebAdvisor installation.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub url: String,
    /// Verify the portal's TLS certificate
    #[serde(default = "default_verify")]
    pub verify: bool,
    #[serde(default)]
    pub requires_auth: bool,
    pub default_term: String,
    /// Link texts followed from the main menu to reach the section search form
    #[serde(default)]
    pub to_section: Vec<String>,
    #[serde(default = "default_login_link")]
    pub login_link: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

fn default_verify() -> bool {
    true
}

fn default_login_link() -> String {
    "Log In".into()
}

fn default_timeout_secs() -> u64 {
    6
}

fn default_requests_per_second() -> u32 {
    2
}

impl SiteConfig {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.username.as_deref()?, self.password.as_deref()?))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Every configured site, keyed by a short name such as `oasis`.
#[derive(Debug, Default, Deserialize)]
pub struct Sites {
    #[serde(default)]
    pub default_site: Option<String>,
    #[serde(default)]
    pub sites: HashMap<String, SiteConfig>,
}

impl Sites {
    /// Reads the site file at `path` (extension optional), then applies
    /// `WA_`-prefixed environment overrides such as `WA_SITES__OASIS__PASSWORD`.
    /// The file may be absent unless `required` is set.
    pub fn load(path: &str, required: bool) -> Result<Self, config::ConfigError> {
        Config::builder()
            .add_source(File::with_name(path).required(required))
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    /// Looks up `key`, or the configured default site when no key is given.
    pub fn resolve(&self, key: Option<&str>) -> Result<SiteConfig, FetchError> {
        let key = key
            .or(self.default_site.as_deref())
            .ok_or_else(|| FetchError::SiteUnresolved {
                site: "(none given and no default_site)".into(),
            })?;
        self.sites
            .get(key)
            .or_else(|| self.sites.get(&key.to_ascii_lowercase()))
            .cloned()
            .ok_or_else(|| FetchError::SiteUnresolved { site: key.into() })
    }
}

/// Values stay strings until deserialized, so a password like `007` or a
/// term like `0516` reaches the portal as written.
fn environment() -> Environment {
    Environment::with_prefix("WA")
        .prefix_separator("_")
        .separator("__")
}
