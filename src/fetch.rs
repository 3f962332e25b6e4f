use crate::error::FetchError;
use crate::scrape::portal_message;
use crate::site::SiteConfig;
use crate::structs::CourseFilter;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use log::{debug, info};
use reqwest::{Client, RequestBuilder, Response, Url};
use scraper::{Html, Selector};
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::LazyLock;

type Result<T> = std::result::Result<T, FetchError>;

static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

const TOKEN_COOKIE: &str = "LASTTOKEN";
const TOKEN_PARAM: &str = "TOKENIDX";
/// Subject, level, course number, section
const SEARCH_COLUMNS: usize = 4;

/// Runs one section search against `site` and returns the results page.
///
/// Logs in first when the site requires it, then walks the site's
/// `to_section` links from the main menu to the search form.
pub async fn fetch(site: &SiteConfig, filters: &[CourseFilter], term: Option<&str>) -> Result<String> {
    let term = term.unwrap_or(&site.default_term);
    let credentials = if site.requires_auth {
        Some(site.credentials().ok_or_else(|| FetchError::AuthenticationFailed {
            reason: "site requires login but no username/password is configured".into(),
        })?)
    } else {
        None
    };

    let mut session = WebAdvisor::connect(site).await?;
    if let Some((username, password)) = credentials {
        session.login(&site.login_link, username, password).await?;
    }
    for link in &site.to_section {
        session.follow_link(link).await?;
    }

    info!(
        "searching {} for term {term}",
        filters.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    );
    session.search(term, filters).await
}

/// Client and politeness limit shared by every request of a session.
struct Transport {
    client: Client,
    limiter: DefaultDirectRateLimiter,
}

impl Transport {
    fn new(site: &SiteConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .timeout(site.timeout())
            .danger_accept_invalid_certs(!site.verify)
            .build()?;
        let rate = NonZeroU32::new(site.requests_per_second).unwrap_or(NonZeroU32::MIN);
        Ok(Transport {
            client,
            limiter: RateLimiter::direct(Quota::per_second(rate)),
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.limiter.until_ready().await;
        let response = request.send().await?;
        let status = response.status();
        debug!("{status} {}", response.url());
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status,
                url: response.url().to_string(),
            });
        }
        Ok(response)
    }
}

#[derive(Debug)]
struct Page {
    url: Url,
    body: String,
}

impl Page {
    async fn read(response: Response) -> Result<Self> {
        let url = response.url().clone();
        let body = response.text().await?;
        Ok(Page { url, body })
    }
}

/// A WebAdvisor session positioned on some page of the portal.
pub struct WebAdvisor {
    http: Transport,
    page: Page,
}

impl WebAdvisor {
    /// Opens a session on the main menu. WebAdvisor hands out its session
    /// token as a `LASTTOKEN` cookie when asked with an empty `TOKENIDX`, and
    /// expects it back as `TOKENIDX` on every page after that.
    pub async fn connect(site: &SiteConfig) -> Result<Self> {
        let http = Transport::new(site)?;

        let landing = http.send(http.client.get(&site.url)).await?;
        let landing_url = landing.url().clone();
        let tokened = http
            .send(http.client.get(landing_url).query(&[(TOKEN_PARAM, "")]))
            .await?;
        let token = tokened
            .cookies()
            .find(|c| c.name() == TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or_else(|| FetchError::Navigation {
                what: format!("{TOKEN_COOKIE} cookie"),
            })?;
        debug!("session token {token}");

        let menu = with_query(tokened.url(), TOKEN_PARAM, &token);
        let page = Page::read(http.send(http.client.get(menu)).await?).await?;
        Ok(WebAdvisor { http, page })
    }

    /// Follows the first link on the current page whose text contains `text`.
    pub async fn follow_link(&mut self, text: &str) -> Result<()> {
        let href = find_link(&self.page.body, text).ok_or_else(|| FetchError::Navigation {
            what: format!("link '{text}'"),
        })?;
        let url = self
            .page
            .url
            .join(&href)
            .map_err(|_| FetchError::Navigation {
                what: format!("usable address behind link '{text}'"),
            })?;
        debug!("following '{text}' to {url}");
        self.get(url).await
    }

    pub async fn login(&mut self, login_link: &str, username: &str, password: &str) -> Result<()> {
        self.follow_link(login_link).await?;
        let url = self.page.url.clone();
        let form = [
            ("USER.NAME", username),
            ("CURR.PWD", password),
            ("RETURN.URL", url.as_str()),
        ];
        self.post(url.clone(), &form).await?;

        if let Some(reason) = portal_message(&Html::parse_document(&self.page.body)) {
            return Err(FetchError::AuthenticationFailed { reason });
        }
        info!("logged in as {username}");
        Ok(())
    }

    /// Submits the section search form on the current page. Consumes the
    /// session: one search per session.
    pub async fn search(mut self, term: &str, filters: &[CourseFilter]) -> Result<String> {
        let form = search_form(term, self.page.url.as_str(), filters);
        let url = with_query(&self.page.url, "APP", "ST");
        self.post(url, &form).await?;
        Ok(self.page.body)
    }

    async fn get(&mut self, url: Url) -> Result<()> {
        let response = self.http.send(self.http.client.get(url)).await?;
        self.page = Page::read(response).await?;
        Ok(())
    }

    async fn post<T: Serialize + ?Sized>(&mut self, url: Url, form: &T) -> Result<()> {
        let response = self.http.send(self.http.client.post(url).form(form)).await?;
        self.page = Page::read(response).await?;
        Ok(())
    }
}

/// Form fields of the section search. Row `r`, column `c` of the criteria
/// grid is `LIST.VARc_r`.
fn search_form(term: &str, return_url: &str, filters: &[CourseFilter]) -> Vec<(String, String)> {
    // The portal rejects a grid with a single row.
    let rows = filters.len().max(2).to_string();

    let mut form = vec![("VAR1".to_string(), term.to_string())];
    for col in 1..=SEARCH_COLUMNS {
        form.push((format!("LIST.VAR{col}_MAX"), rows.clone()));
    }
    form.push(("RETURN.URL".into(), return_url.into()));
    form.push(("LIST.VAR1_CONTROLLER".into(), "LIST.VAR1".into()));
    form.push((
        "LIST.VAR1_MEMBERS".into(),
        "LIST.VAR1*LIST.VAR2*LIST.VAR3*LIST.VAR4".into(),
    ));

    for (row, filter) in filters.iter().enumerate() {
        let columns: [&str; SEARCH_COLUMNS] = [
            &filter.subject,
            "",
            filter.number.as_deref().unwrap_or_default(),
            filter.section.as_deref().unwrap_or_default(),
        ];
        for (col, value) in columns.into_iter().enumerate() {
            form.push((format!("LIST.VAR{}_{}", col + 1, row + 1), value.into()));
        }
    }

    form
}

fn find_link(body: &str, text: &str) -> Option<String> {
    Html::parse_document(body)
        .select(&LINK_SEL)
        .find(|a| a.text().collect::<String>().contains(text))
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

/// `url` with `key` set to `value`, replacing any earlier `key`.
fn with_query(url: &Url, key: &str, value: &str) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut url = url.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(key, value);
    url
}
