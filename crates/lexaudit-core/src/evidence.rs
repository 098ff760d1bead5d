//! Evidence aggregation: per-document extraction results → one bundle per law.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::category::DocumentCategory;
use crate::extraction::ExtractionResult;
use crate::record::LawRecord;
use crate::text::{char_len, truncate_in_place};

/// Default per-category cap, in characters.
pub const DEFAULT_MAX_CATEGORY_CHARS: usize = 30_000;

/// Consultation evidence found on the public consultation portal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consultation {
    pub url: Option<String>,
    pub text: String,
    /// Date-like tokens in page order, unvalidated.
    pub dates: Vec<String>,
}

impl Consultation {
    /// No consultation record could be located.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.url.is_some()
    }
}

/// A scanned document handed to the reasoning capability as a file instead
/// of being transcribed first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub category: DocumentCategory,
    pub description: String,
    pub file_uri: String,
    pub mime_type: String,
}

/// Everything the audit step sees about one law.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub sections: BTreeMap<DocumentCategory, String>,
    pub consultation_url: Option<String>,
    pub consultation_text: String,
    pub consultation_dates: Vec<String>,
    pub metadata: LawRecord,
    pub attachments: Vec<Attachment>,
}

impl EvidenceBundle {
    pub fn section(&self, category: DocumentCategory) -> &str {
        self.sections.get(&category).map(String::as_str).unwrap_or("")
    }

    /// True when no document contributed text and nothing was attached.
    pub fn is_empty(&self) -> bool {
        self.sections.values().all(|s| s.is_empty()) && self.attachments.is_empty()
    }

    pub fn total_chars(&self) -> usize {
        self.sections.values().map(|s| char_len(s)).sum()
    }
}

/// Merges extraction results into an [`EvidenceBundle`].
#[derive(Debug, Clone)]
pub struct EvidenceAggregator {
    max_category_chars: usize,
}

impl Default for EvidenceAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CATEGORY_CHARS)
    }
}

impl EvidenceAggregator {
    pub fn new(max_category_chars: usize) -> Self {
        Self { max_category_chars }
    }

    pub fn max_category_chars(&self) -> usize {
        self.max_category_chars
    }

    /// Build the bundle.
    ///
    /// `results[i]` belongs to `record.documents[i]`. Documents are appended
    /// in record order; failed results contribute nothing. Each category is
    /// truncated to the configured cap once everything has been appended.
    pub fn aggregate(
        &self,
        record: &LawRecord,
        results: &[ExtractionResult],
        consultation: Consultation,
    ) -> EvidenceBundle {
        if results.len() != record.documents.len() {
            debug!(
                documents = record.documents.len(),
                results = results.len(),
                "result count does not match document count"
            );
        }

        let mut sections: BTreeMap<DocumentCategory, String> = BTreeMap::new();
        for (doc, result) in record.documents.iter().zip(results) {
            if result.is_failed() || result.text.is_empty() {
                continue;
            }
            let section = sections.entry(doc.category).or_default();
            section.push_str(&section_header(doc.category, &doc.description));
            section.push_str(&result.text);
            section.push('\n');
        }

        for (category, text) in sections.iter_mut() {
            let before = char_len(text);
            if truncate_in_place(text, self.max_category_chars) {
                info!(
                    category = %category,
                    before,
                    after = self.max_category_chars,
                    "truncated evidence section"
                );
            }
        }

        EvidenceBundle {
            sections,
            consultation_url: consultation.url,
            consultation_text: consultation.text,
            consultation_dates: consultation.dates,
            metadata: record.clone(),
            attachments: Vec::new(),
        }
    }
}

fn section_header(category: DocumentCategory, description: &str) -> String {
    if description.trim().is_empty() {
        format!("--- {} ---\n", category.label())
    } else {
        format!("--- {}: {} ---\n", category.label(), description.trim())
    }
}
