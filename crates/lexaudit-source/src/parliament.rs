//! Hellenic Parliament structured data API client.
//!
//! `GET /api.ashx?q=laws&lawnum=<n>` for numeric queries,
//! `GET /api.ashx?q=laws&freetext=<text>` otherwise. The endpoint answers
//! either a paged envelope (`TotalRecords` + `Data`) or, on some deployments,
//! a bare array of law objects; both decode into [`ApiResponse`].

use async_trait::async_trait;
use lexaudit_core::query::strip_year_suffix;
use lexaudit_core::{DocumentCategory, DocumentRef, LawQuery, LawRecord, categorize};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::SourceError;
use crate::http::{HttpConfig, PARLIAMENT_HOST, check_status};

const FREETEXT_PAGE_SIZE: u32 = 5;

/// Structured law search.
#[async_trait]
pub trait LawApi: Send + Sync {
    /// All candidate records for the query. An empty list is a miss.
    async fn search(&self, query: &LawQuery) -> Result<Vec<ApiLaw>, SourceError>;
}

/// API response envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse {
    Paged {
        #[serde(rename = "TotalRecords", default)]
        total_records: u64,
        #[serde(rename = "Data", default)]
        data: Vec<ApiLaw>,
    },
    List(Vec<ApiLaw>),
}

impl ApiResponse {
    pub fn into_laws(self) -> Vec<ApiLaw> {
        match self {
            Self::Paged {
                total_records: 0, ..
            } => Vec::new(),
            Self::Paged { data, .. } => data,
            Self::List(laws) => laws,
        }
    }
}

/// One law as returned by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiLaw {
    #[serde(rename = "Title", alias = "title", default)]
    pub title: String,
    #[serde(
        rename = "LawNum",
        alias = "LawNumber",
        alias = "lawnum",
        default,
        deserialize_with = "string_or_number"
    )]
    pub law_number: Option<String>,
    #[serde(
        rename = "LawId",
        alias = "id",
        default,
        deserialize_with = "string_or_number"
    )]
    pub law_id: Option<String>,
    #[serde(rename = "LawPhotocopy", default)]
    pub photocopies: Vec<ApiFile>,
    #[serde(rename = "VotedText", default)]
    pub voted_text: Vec<ApiFile>,
    #[serde(rename = "Amendments", default)]
    pub amendments: Vec<ApiFile>,
    #[serde(rename = "Reports", default)]
    pub reports: Vec<ApiFile>,
}

/// A file entry inside one of the law's document collections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiFile {
    #[serde(rename = "File", alias = "Url", default)]
    pub file: Option<String>,
    #[serde(rename = "FileType", default)]
    pub file_type: String,
    #[serde(rename = "Description", default)]
    pub description: String,
}

impl ApiLaw {
    /// Convert to a [`LawRecord`].
    ///
    /// Collections are walked in a fixed order (photocopies, voted text,
    /// amendments, reports), preserving entry order inside each. A file's
    /// `FileType` label decides its category; the collection it sits in is
    /// the fallback.
    pub fn into_record(self) -> LawRecord {
        let collections = [
            (self.photocopies, DocumentCategory::PrincipalLawText),
            (self.voted_text, DocumentCategory::VotedText),
            (self.amendments, DocumentCategory::Amendment),
            (self.reports, DocumentCategory::CommitteeReport),
        ];

        let mut documents = Vec::new();
        for (files, fallback) in collections {
            for f in files {
                let Some(url) = f.file.filter(|u| !u.trim().is_empty()) else {
                    continue;
                };
                let category = categorize(&f.file_type)
                    .or_else(|| categorize(&f.description))
                    .unwrap_or(fallback);
                let description = if f.description.trim().is_empty() {
                    f.file_type
                } else {
                    f.description
                };
                documents.push(DocumentRef::new(url.trim(), category, description.trim()));
            }
        }

        LawRecord {
            title: self.title.trim().to_string(),
            law_number: self.law_number,
            law_id: self.law_id,
            source_url: None,
            documents,
        }
    }
}

/// Pick one record out of the API's candidates.
///
/// Numeric queries prefer the record whose law number equals the query; the
/// API ranks loosely, so the first entry is only the fallback.
pub fn select_record(laws: Vec<ApiLaw>, query: &LawQuery) -> Option<ApiLaw> {
    if let LawQuery::Number(n) = query
        && let Some(idx) = laws.iter().position(|law| {
            law.law_number
                .as_deref()
                .is_some_and(|num| strip_year_suffix(num) == n.as_str())
        })
    {
        return laws.into_iter().nth(idx);
    }
    laws.into_iter().next()
}

/// HTTP client for the Parliament API.
pub struct ParliamentClient {
    client: reqwest::Client,
    api_url: String,
}

impl ParliamentClient {
    pub fn new(config: &HttpConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: config.build_client()?,
            api_url: format!("{PARLIAMENT_HOST}/api.ashx"),
        })
    }

    /// Point the client at a different API endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    fn params(query: &LawQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", "laws".to_string()), ("format", "json".to_string())];
        match query {
            LawQuery::Number(n) => params.push(("lawnum", n.clone())),
            LawQuery::Title(t) => {
                params.push(("freetext", t.clone()));
                params.push(("pageSize", FREETEXT_PAGE_SIZE.to_string()));
            }
        }
        params
    }
}

#[async_trait]
impl LawApi for ParliamentClient {
    async fn search(&self, query: &LawQuery) -> Result<Vec<ApiLaw>, SourceError> {
        info!(url = %self.api_url, query = %query, "querying parliament API");
        let resp = self
            .client
            .get(&self.api_url)
            .query(&Self::params(query))
            .send()
            .await?;
        let body = check_status(resp).await?.text().await?;
        let laws = serde_json::from_str::<ApiResponse>(&body)?.into_laws();
        debug!(count = laws.len(), "parliament API candidates");
        Ok(laws)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
