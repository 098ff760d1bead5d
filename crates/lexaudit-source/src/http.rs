//! Shared HTTP client construction and URL normalisation.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use url::Url;

use crate::SourceError;

/// Host that relative document paths are resolved against.
pub const PARLIAMENT_HOST: &str = "https://www.hellenicparliament.gr";

/// Some Parliament and search pages refuse non-browser agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl HttpConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build_client(&self) -> Result<reqwest::Client, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("lexaudit")),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,application/pdf,*/*;q=0.8",
            ),
        );

        Ok(reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()?)
    }
}

/// Pass a successful response through; turn any other status into
/// [`SourceError::Server`] carrying the body.
pub(crate) async fn check_status(
    resp: reqwest::Response,
) -> Result<reqwest::Response, SourceError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SourceError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

pub fn parliament_base() -> Url {
    Url::parse(PARLIAMENT_HOST).expect("PARLIAMENT_HOST is a valid URL")
}

/// Resolve `href` against `base`. Absolute hrefs are returned unchanged.
pub fn resolve_url(base: &Url, href: &str) -> Result<Url, SourceError> {
    base.join(href.trim()).map_err(|source| SourceError::InvalidUrl {
        url: href.to_string(),
        source,
    })
}
