//! Law page scraping: the fallback when the API has nothing.
//!
//! A Parliament law page lists its documents as plain links. The link text
//! is the only metadata available, so it goes through the same keyword table
//! the API path uses.

use std::collections::HashSet;

use lexaudit_core::text::collapse_whitespace;
use lexaudit_core::{DocumentCategory, DocumentRef, LawRecord};
use scraper::{Html, Selector};
use url::Url;

use crate::http::resolve_url;

/// Parliament law page for an API law id.
pub const LAW_PAGE_TEMPLATE: &str =
    "https://www.hellenicparliament.gr/Nomothetiko-Ergo/Anazitisi-Nomothetikou-Ergou?law_id=";

pub fn law_page_url(law_id: &str) -> String {
    format!("{LAW_PAGE_TEMPLATE}{law_id}")
}

/// What a law page yielded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapedPage {
    pub title: Option<String>,
    pub documents: Vec<DocumentRef>,
}

impl ScrapedPage {
    /// Synthesize a record. `fallback_title` is used when the page had no heading.
    pub fn into_record(self, page_url: &str, fallback_title: &str) -> LawRecord {
        LawRecord {
            title: self.title.unwrap_or_else(|| fallback_title.to_string()),
            law_number: None,
            law_id: None,
            source_url: Some(page_url.to_string()),
            documents: self.documents,
        }
    }
}

/// Parse a law page for its title and document links.
///
/// Title: first non-empty `h1`, then `h2`, then `<title>`. Documents: every
/// `a[href]` pointing at a PDF or the `UserFiles` store, resolved against
/// `base`, first occurrence wins.
pub fn parse_law_page(html: &str, base: &Url) -> ScrapedPage {
    let doc = Html::parse_document(html);

    let title = ["h1", "h2", "title"].iter().find_map(|sel| {
        let selector = Selector::parse(sel).ok()?;
        doc.select(&selector)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .find(|t| !t.is_empty())
    });

    let mut documents = Vec::new();
    let Ok(links) = Selector::parse("a[href]") else {
        return ScrapedPage { title, documents };
    };

    let mut seen = HashSet::new();
    for a in doc.select(&links) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        if !is_document_link(href) {
            continue;
        }
        let Ok(url) = resolve_url(base, href) else {
            continue;
        };
        if !seen.insert(url.to_string()) {
            continue;
        }

        let text = collapse_whitespace(&a.text().collect::<String>());
        let label = if text.is_empty() {
            a.value().attr("title").unwrap_or_default().to_string()
        } else {
            text
        };
        let category = DocumentCategory::from_label(&label);
        documents.push(DocumentRef::new(url.as_str(), category, label));
    }

    ScrapedPage { title, documents }
}

fn is_document_link(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    lower.contains(".pdf") || href.contains("UserFiles")
}
