//! Consultation Finder: best-effort lookup of the public consultation record.
//!
//! opengov.gr has no API and no stable link to Parliament records, so the
//! consultation is found by searching the portal's domain for the law's
//! title. Every failure degrades to [`Consultation::unavailable`].

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use lexaudit_core::Consultation;
use lexaudit_core::category::fold;
use lexaudit_core::text::{collapse_whitespace, truncate_chars};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::SourceError;
use crate::fetch::PageSource;
use crate::http::{HttpConfig, check_status};

/// Grammatical particles and generic legislative nouns that only add noise
/// to a title search.
pub const STOPWORDS: &[&str] = &[
    "ο", "η", "το", "οι", "τα", "του", "της", "των", "τον", "την", "τη", "τις", "τους", "και",
    "ή", "με", "σε", "στο", "στη", "στην", "στον", "στα", "στις", "στους", "για", "από", "προς",
    "κατά", "περί", "επί", "δια", "ως", "που", "άλλες", "άλλα", "λοιπές", "λοιπά", "νόμος",
    "νόμου", "νόμων", "σχέδιο", "διατάξεις", "διάταξη", "ρυθμίσεις", "ρύθμιση", "τροποποίηση",
    "τροποποιήσεις", "κύρωση", "ενσωμάτωση", "οδηγίας", "οδηγία", "θέματα", "επείγουσες",
    "ν.", "ν",
];

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,2}[./-]\d{1,2}[./-]\d{2,4}\b").expect("date pattern compiles")
});

const SKIPPED_TAGS: &[&str] = &["script", "style", "nav", "footer", "noscript"];

/// External web search, restricted by the query itself.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Raw result hrefs in rank order; may include redirect wrappers.
    async fn search(&self, query: &str) -> Result<Vec<String>, SourceError>;
}

#[derive(Debug, Clone)]
pub struct ConsultationConfig {
    /// Portal domain; subdomains match too.
    pub domain: String,
    /// Title tokens kept after stopword removal.
    pub max_query_tokens: usize,
    /// Appended to every query.
    pub query_suffix: String,
    pub max_text_chars: usize,
}

impl Default for ConsultationConfig {
    fn default() -> Self {
        Self {
            domain: "opengov.gr".to_string(),
            max_query_tokens: 6,
            query_suffix: "διαβούλευση".to_string(),
            max_text_chars: 25_000,
        }
    }
}

pub struct ConsultationFinder {
    search: Arc<dyn WebSearch>,
    pages: Arc<dyn PageSource>,
    config: ConsultationConfig,
}

impl ConsultationFinder {
    pub fn new(
        search: Arc<dyn WebSearch>,
        pages: Arc<dyn PageSource>,
        config: ConsultationConfig,
    ) -> Self {
        Self {
            search,
            pages,
            config,
        }
    }

    /// Locate and read the consultation page for `law_title`.
    pub async fn find(&self, law_title: &str) -> Consultation {
        let Some(query) = build_query(law_title, &self.config) else {
            debug!(title = law_title, "no searchable tokens in title");
            return Consultation::unavailable();
        };

        info!(query = %query, "searching for consultation");
        let hrefs = match self.search.search(&query).await {
            Ok(hrefs) => hrefs,
            Err(e) => {
                warn!(error = %e, "consultation search unavailable");
                return Consultation::unavailable();
            }
        };

        let Some(url) = first_portal_result(&hrefs, &self.config.domain) else {
            info!(results = hrefs.len(), "no consultation result on portal domain");
            return Consultation::unavailable();
        };

        let html = match self.pages.fetch_page(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url = %url, error = %e, "consultation page fetch failed");
                return Consultation::unavailable();
            }
        };

        let text = page_text(&html);
        let dates = extract_dates(&text);
        let text = truncate_chars(&text, self.config.max_text_chars).to_string();
        info!(url = %url, chars = text.chars().count(), dates = dates.len(), "consultation found");
        Consultation {
            url: Some(url),
            text,
            dates,
        }
    }
}

/// `site:<domain> <≤N title tokens> <suffix>`, or `None` if no token survives.
pub fn build_query(law_title: &str, config: &ConsultationConfig) -> Option<String> {
    let stopwords: Vec<String> = STOPWORDS.iter().map(|w| fold(w)).collect();
    let tokens: Vec<&str> = law_title
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '/'))
        .filter(|t| !t.is_empty() && !stopwords.contains(&fold(t)))
        .take(config.max_query_tokens)
        .collect();

    if tokens.is_empty() {
        return None;
    }
    Some(format!(
        "site:{} {} {}",
        config.domain,
        tokens.join(" "),
        config.query_suffix
    ))
    .map(|q| q.trim_end().to_string())
}

/// First result that lives on `domain`, with search wrappers unwrapped.
pub fn first_portal_result(hrefs: &[String], domain: &str) -> Option<String> {
    hrefs
        .iter()
        .filter_map(|h| unwrap_redirect(h))
        .find(|u| is_on_domain(u, domain))
        .map(|u| u.to_string())
}

/// Resolve a search-result href to its target.
///
/// Redirect and tracking wrappers (`/url?q=...`, `...?url=...`) yield the
/// wrapped address; plain absolute links are returned as-is.
pub fn unwrap_redirect(href: &str) -> Option<Url> {
    let base = Url::parse("https://www.google.com/").ok()?;
    let url = base.join(href.trim()).ok()?;

    for (key, value) in url.query_pairs() {
        if (key == "url" || key == "q")
            && (value.starts_with("http://") || value.starts_with("https://"))
        {
            return Url::parse(&value).ok();
        }
    }
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn is_on_domain(url: &Url, domain: &str) -> bool {
    url.host_str()
        .is_some_and(|h| h == domain || h.ends_with(&format!(".{domain}")))
}

/// Visible text of a page without scripts, styles, navigation and footers.
pub fn page_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();
    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| SKIPPED_TAGS.contains(&e.name()))
        });
        if !hidden {
            parts.push(text);
        }
    }
    collapse_whitespace(&parts.join(" "))
}

/// Day/month/year tokens in order of first appearance. No calendar check.
pub fn extract_dates(text: &str) -> Vec<String> {
    let mut dates: Vec<String> = Vec::new();
    for m in DATE_PATTERN.find_iter(text) {
        if !dates.iter().any(|d| d == m.as_str()) {
            dates.push(m.as_str().to_string());
        }
    }
    dates
}

/// [`WebSearch`] over Google's HTML results page.
///
/// Frequently rate-limited (HTTP 429); callers treat any error as "no
/// consultation".
pub struct GoogleSearch {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleSearch {
    pub fn new(config: &HttpConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: config.build_client()?,
            endpoint: "https://www.google.com/search".to_string(),
        })
    }
}

#[async_trait]
impl WebSearch for GoogleSearch {
    async fn search(&self, query: &str) -> Result<Vec<String>, SourceError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await?;
        let html = check_status(resp).await?.text().await?;
        Ok(result_links(&html))
    }
}

fn result_links(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct FakeSearch {
        results: Result<Vec<String>, u16>,
        queries: std::sync::Mutex<Vec<String>>,
    }

    impl FakeSearch {
        fn returning(results: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                results: Ok(results.iter().map(|s| s.to_string()).collect()),
                queries: std::sync::Mutex::new(Vec::new()),
            })
        }

        fn blocked() -> Arc<Self> {
            Arc::new(Self {
                results: Err(429),
                queries: std::sync::Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl WebSearch for FakeSearch {
        async fn search(&self, query: &str) -> Result<Vec<String>, SourceError> {
            self.queries.lock().unwrap().push(query.to_string());
            match &self.results {
                Ok(r) => Ok(r.clone()),
                Err(status) => Err(SourceError::Server {
                    status: *status,
                    body: "Too Many Requests".into(),
                }),
            }
        }
    }

    struct FakePages {
        html: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for FakePages {
        async fn fetch_page(&self, _url: &str) -> Result<String, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.html.to_string())
        }
    }

    const CONSULTATION_PAGE: &str = r#"<html><head><style>.x{}</style>
        <script>var d = "01/01/1999";</script></head>
        <body><nav>Μενού</nav>
        <p>Η διαβούλευση ξεκίνησε 03/02/2022 και ολοκληρώθηκε 17.02.2022.</p>
        <p>Υπενθύμιση: έως 17.02.2022 στις 12:00.</p>
        <footer>© 12-12-2012</footer></body></html>"#;

    fn pages() -> Arc<FakePages> {
        Arc::new(FakePages {
            html: CONSULTATION_PAGE,
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn query_drops_stopwords_and_caps_tokens() {
        let config = ConsultationConfig::default();
        let q = build_query(
            "Κύρωση της Σύμβασης για την προστασία των δεδομένων προσωπικού χαρακτήρα και άλλες διατάξεις",
            &config,
        )
        .unwrap();
        assert_eq!(
            q,
            "site:opengov.gr Σύμβασης προστασία δεδομένων προσωπικού χαρακτήρα διαβούλευση"
        );

        let q = build_query("α β γ δ ε ζ η θ", &config).unwrap();
        assert_eq!(q, "site:opengov.gr α β γ δ ε ζ διαβούλευση");
    }

    #[test]
    fn query_none_when_only_stopwords() {
        assert!(build_query("Ρυθμίσεις και άλλες διατάξεις", &ConsultationConfig::default()).is_none());
    }

    #[test]
    fn unwraps_search_redirects() {
        let u = unwrap_redirect("/url?q=https://www.opengov.gr/minfin/?p=123&sa=U").unwrap();
        assert_eq!(u.as_str(), "https://www.opengov.gr/minfin/?p=123");

        let u = unwrap_redirect("https://tracker.example/r?url=https%3A%2F%2Fopengov.gr%2Fx").unwrap();
        assert_eq!(u.as_str(), "https://opengov.gr/x");

        let u = unwrap_redirect("https://www.opengov.gr/a").unwrap();
        assert_eq!(u.as_str(), "https://www.opengov.gr/a");

        assert!(unwrap_redirect("javascript:void(0)").is_none());
    }

    #[test]
    fn first_result_on_portal_domain() {
        let hrefs = vec![
            "/search?q=other".to_string(),
            "https://maps.google.com/?q=x".to_string(),
            "https://notopengov.gr/a".to_string(),
            "/url?q=https://www.opengov.gr/ypes/?p=9&sa=U".to_string(),
            "https://opengov.gr/later".to_string(),
        ];
        assert_eq!(
            first_portal_result(&hrefs, "opengov.gr").as_deref(),
            Some("https://www.opengov.gr/ypes/?p=9")
        );
    }

    #[test]
    fn page_text_strips_markup_noise() {
        let text = page_text(CONSULTATION_PAGE);
        assert!(text.contains("Η διαβούλευση ξεκίνησε 03/02/2022"));
        assert!(!text.contains("Μενού"));
        assert!(!text.contains("var d"));
        assert!(!text.contains("12-12-2012"));
    }

    #[test]
    fn dates_in_order_without_duplicates() {
        let dates = extract_dates("από 3/2/22 έως 17.02.2022, παράταση 17.02.2022 και 1-3-2022");
        assert_eq!(dates, vec!["3/2/22", "17.02.2022", "1-3-2022"]);
        assert!(extract_dates("χωρίς ημερομηνίες 2022").is_empty());
    }

    #[tokio::test]
    async fn finds_and_reads_consultation() {
        let search = FakeSearch::returning(&["/url?q=https://www.opengov.gr/minfin/?p=1&sa=U"]);
        let pages = pages();
        let finder = ConsultationFinder::new(search.clone(), pages.clone(), ConsultationConfig::default());

        let c = finder.find("Προστασία δεδομένων").await;
        assert_eq!(c.url.as_deref(), Some("https://www.opengov.gr/minfin/?p=1"));
        assert_eq!(c.dates, vec!["03/02/2022", "17.02.2022"]);
        assert!(c.text.contains("διαβούλευση"));
        assert_eq!(
            search.queries.lock().unwrap().as_slice(),
            ["site:opengov.gr Προστασία δεδομένων διαβούλευση"]
        );
    }

    #[tokio::test]
    async fn text_truncated_to_limit() {
        let search = FakeSearch::returning(&["https://www.opengov.gr/p"]);
        let config = ConsultationConfig {
            max_text_chars: 10,
            ..ConsultationConfig::default()
        };
        let finder = ConsultationFinder::new(search, pages(), config);
        let c = finder.find("Προστασία δεδομένων").await;
        assert_eq!(c.text.chars().count(), 10);
    }

    #[tokio::test]
    async fn blocked_search_is_unavailable() {
        let pages = pages();
        let finder = ConsultationFinder::new(FakeSearch::blocked(), pages.clone(), ConsultationConfig::default());
        let c = finder.find("Προστασία δεδομένων").await;
        assert_eq!(c, Consultation::unavailable());
        assert_eq!(pages.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_portal_result_is_unavailable() {
        let search = FakeSearch::returning(&["https://example.com/a", "/search?q=b"]);
        let pages = pages();
        let finder = ConsultationFinder::new(search, pages.clone(), ConsultationConfig::default());
        let c = finder.find("Προστασία δεδομένων").await;
        assert!(!c.is_available());
        assert!(c.text.is_empty());
        assert_eq!(pages.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn google_result_links_collected() {
        let html = r#"<a href="/url?q=https://www.opengov.gr/a&amp;sa=U">x</a><a href="/b">y</a>"#;
        assert_eq!(
            result_links(html),
            vec!["/url?q=https://www.opengov.gr/a&sa=U", "/b"]
        );
    }
}
