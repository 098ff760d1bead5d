//! Canonical law record shared by the locator, the fetcher and the auditor.

use serde::{Deserialize, Serialize};

use crate::category::DocumentCategory;

/// One law and the documents attached to it.
///
/// Built once per request by the locator, whichever source answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LawRecord {
    pub title: String,
    pub law_number: Option<String>,
    /// Internal Parliament id, used to derive the law page URL.
    pub law_id: Option<String>,
    /// Page the documents were scraped from, if any.
    pub source_url: Option<String>,
    /// Source order (API or page order), never re-sorted.
    pub documents: Vec<DocumentRef>,
}

impl LawRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn has_documents(&self) -> bool {
        !self.documents.is_empty()
    }

    /// Count of documents per category, in category order.
    pub fn category_counts(&self) -> Vec<(DocumentCategory, usize)> {
        DocumentCategory::ALL
            .iter()
            .map(|c| (*c, self.documents.iter().filter(|d| d.category == *c).count()))
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}

/// A single document attached to a law.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Absolute, or relative to the Parliament host.
    pub url: String,
    pub category: DocumentCategory,
    #[serde(default)]
    pub description: String,
}

impl DocumentRef {
    pub fn new(
        url: impl Into<String>,
        category: DocumentCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            category,
            description: description.into(),
        }
    }

    pub fn is_relative(&self) -> bool {
        !(self.url.starts_with("http://") || self.url.starts_with("https://"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_urls_detected() {
        let doc = DocumentRef::new("/UserFiles/a.pdf", DocumentCategory::Other, "");
        assert!(doc.is_relative());
        let doc = DocumentRef::new("https://example.gr/a.pdf", DocumentCategory::Other, "");
        assert!(!doc.is_relative());
    }

    #[test]
    fn category_counts_skip_empty() {
        let mut record = LawRecord::new("Test");
        record.documents = vec![
            DocumentRef::new("/a.pdf", DocumentCategory::CommitteeReport, ""),
            DocumentRef::new("/b.pdf", DocumentCategory::PrincipalLawText, ""),
            DocumentRef::new("/c.pdf", DocumentCategory::CommitteeReport, ""),
        ];
        assert_eq!(
            record.category_counts(),
            vec![
                (DocumentCategory::PrincipalLawText, 1),
                (DocumentCategory::CommitteeReport, 2),
            ]
        );
    }

    #[test]
    fn record_metadata_json() {
        let mut record = LawRecord::new("Κύρωση");
        record.law_number = Some("4940".into());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["title"], "Κύρωση");
        assert_eq!(json["law_number"], "4940");
        assert!(json["documents"].as_array().unwrap().is_empty());
    }
}
