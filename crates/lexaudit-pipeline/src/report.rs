//! The exported audit report.

use chrono::{DateTime, Utc};
use lexaudit_core::{DocumentCategory, ExtractionMode, LawRecord, Verdict};
use serde::{Deserialize, Serialize};

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub url: String,
    pub category: DocumentCategory,
    pub description: String,
    pub mode: ExtractionMode,
    pub chars: usize,
    /// Passed to the audit as a file instead of text.
    #[serde(default)]
    pub attached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full result of one request: everything needed to render or archive it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub record: LawRecord,
    pub documents: Vec<DocumentOutcome>,
    pub consultation_url: Option<String>,
    pub consultation_dates: Vec<String>,
    pub rubric: String,
    pub verdict: Verdict,
    pub generated_at: DateTime<Utc>,
}

impl AuditReport {
    pub fn count(&self, mode: ExtractionMode) -> usize {
        self.documents.iter().filter(|d| d.mode == mode).count()
    }
}
