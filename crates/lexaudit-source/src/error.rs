use thiserror::Error;

/// Transport and decoding failures talking to remote sources.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// One document could not be downloaded.
///
/// Never aborts a batch: the document contributes empty text.
#[derive(Error, Debug)]
#[error("failed to fetch {url}: {cause}")]
pub struct FetchError {
    pub url: String,
    pub cause: String,
}

impl FetchError {
    pub fn new(url: impl Into<String>, cause: impl ToString) -> Self {
        Self {
            url: url.into(),
            cause: cause.to_string(),
        }
    }
}

/// Neither the API nor the fallback page produced a law record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("law not found: {reason}")]
pub struct NotFound {
    pub reason: String,
}

impl NotFound {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
