use std::time::Duration;

use lexaudit_ai::AuditError;
use lexaudit_source::NotFound;
use thiserror::Error;

/// Terminal failure of one audit request.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error("no usable documents for \"{title}\"")]
    NoDocuments { title: String },
    #[error(transparent)]
    Audit(#[from] AuditError),
    #[error("request did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

impl PipelineError {
    /// The stage that failed, for user-facing messages.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "law lookup",
            Self::NoDocuments { .. } => "document retrieval",
            Self::Audit(_) => "audit",
            Self::DeadlineExceeded(_) => "deadline",
        }
    }

    /// What the user can do about it.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotFound(_) => {
                Some("pass the law's Parliament page with --url to scrape it directly")
            }
            Self::NoDocuments { .. } => {
                Some("check the law page; its documents may not be published yet")
            }
            Self::Audit(_) => Some("retry later or choose another model with --model"),
            Self::DeadlineExceeded(_) => Some("raise --deadline or lower --concurrency"),
        }
    }

    /// Raw model output, when the audit step produced some.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Audit(e) => e.raw.as_deref(),
            _ => None,
        }
    }
}
