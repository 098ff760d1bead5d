//! Law Locator: user query → one [`LawRecord`].
//!
//! Primary path is the structured API; the secondary path scrapes a law page
//! the caller supplied directly. Ordinary misses and transport failures both
//! surface as [`NotFound`], with the reason kept for diagnostics.

use std::sync::Arc;

use lexaudit_core::{LawQuery, LawRecord};
use tracing::{info, warn};

use crate::NotFound;
use crate::fetch::PageSource;
use crate::http::parliament_base;
use crate::parliament::{LawApi, select_record};
use crate::scrape::{law_page_url, parse_law_page};

/// Which source is tried first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocatorStrategy {
    #[default]
    ApiFirst,
    /// Scrape the supplied page first; fall back to the API.
    ScrapeFirst,
}

#[derive(Debug, Clone, Default)]
pub struct LocatorConfig {
    pub strategy: LocatorStrategy,
}

pub struct LawLocator {
    api: Arc<dyn LawApi>,
    pages: Arc<dyn PageSource>,
    config: LocatorConfig,
}

impl LawLocator {
    pub fn new(api: Arc<dyn LawApi>, pages: Arc<dyn PageSource>, config: LocatorConfig) -> Self {
        Self { api, pages, config }
    }

    /// Resolve a query and/or a direct page URL to one law record.
    ///
    /// The page is only scraped when a URL was supplied: with
    /// [`LocatorStrategy::ApiFirst`] that happens after the API misses, with
    /// [`LocatorStrategy::ScrapeFirst`] before the API is asked.
    pub async fn locate(
        &self,
        query: Option<&LawQuery>,
        direct_url: Option<&str>,
    ) -> Result<LawRecord, NotFound> {
        let fallback_title = query.map(LawQuery::as_str).unwrap_or_default();

        if self.config.strategy == LocatorStrategy::ScrapeFirst
            && let Some(url) = direct_url
        {
            match self.scrape(url, fallback_title).await {
                Ok(record) => return Ok(record),
                Err(e) => info!(reason = %e.reason, "scrape-first miss, trying API"),
            }
            return match query {
                Some(q) => self.from_api(q).await,
                None => Err(NotFound::new(format!("no documents found at {url}"))),
            };
        }

        let api_miss = match query {
            Some(q) => match self.from_api(q).await {
                Ok(record) if record.has_documents() => return Ok(record),
                Ok(record) => match direct_url {
                    Some(url) => return Ok(self.fill_from_page(record, url).await),
                    None => return Ok(record),
                },
                Err(e) => e,
            },
            None => NotFound::new("no query given"),
        };

        let Some(url) = direct_url else {
            info!(reason = %api_miss.reason, "law not found and no direct URL supplied");
            return Err(api_miss);
        };

        info!(reason = %api_miss.reason, url, "API miss, scraping supplied page");
        self.scrape(url, fallback_title)
            .await
            .map_err(|e| NotFound::new(format!("{}; {}", api_miss.reason, e.reason)))
    }

    /// Take the documents of an API record from a law page, keeping the
    /// API's title, number and id. The record is returned unchanged when the
    /// page lists nothing.
    async fn fill_from_page(&self, record: LawRecord, url: &str) -> LawRecord {
        match self.scrape(url, &record.title).await {
            Ok(scraped) => LawRecord {
                documents: scraped.documents,
                source_url: scraped.source_url,
                ..record
            },
            Err(e) => {
                warn!(url, reason = %e.reason, "law page scrape found no documents");
                record
            }
        }
    }

    async fn from_api(&self, query: &LawQuery) -> Result<LawRecord, NotFound> {
        let laws = match self.api.search(query).await {
            Ok(laws) => laws,
            Err(e) => {
                warn!(query = %query, error = %e, "parliament API request failed");
                return Err(NotFound::new(format!("API error: {e}")));
            }
        };

        let Some(law) = select_record(laws, query) else {
            return Err(NotFound::new(format!("API returned no records for {query:?}")));
        };

        let mut record = law.into_record();
        info!(
            title = %record.title,
            law_number = record.law_number.as_deref().unwrap_or("-"),
            documents = record.documents.len(),
            "law located via API"
        );

        // Record without attached files: the law page usually still lists them.
        if !record.has_documents()
            && let Some(id) = record.law_id.clone()
        {
            record = self.fill_from_page(record, &law_page_url(&id)).await;
        }

        Ok(record)
    }

    async fn scrape(&self, url: &str, fallback_title: &str) -> Result<LawRecord, NotFound> {
        let html = self
            .pages
            .fetch_page(url)
            .await
            .map_err(|e| NotFound::new(format!("fetching {url} failed: {e}")))?;

        let base = parliament_base()
            .join(url)
            .map_err(|e| NotFound::new(format!("invalid URL {url}: {e}")))?;
        let page = parse_law_page(&html, &base);
        if page.documents.is_empty() {
            return Err(NotFound::new(format!("no document links on {url}")));
        }

        let record = page.into_record(base.as_str(), fallback_title);
        info!(
            title = %record.title,
            documents = record.documents.len(),
            url = %base,
            "law located via page scrape"
        );
        Ok(record)
    }
}
