//! Document categories and the keyword table that assigns them.
//!
//! The Parliament API labels each attached file with a free-text type
//! ("Ψηφισθέν κείμενο", "Αιτιολογική έκθεση", ...) and the scraped law pages
//! only offer link text. Both paths go through [`categorize`] so a document
//! lands in the same bucket regardless of where it was discovered.
//!
//! # Matching rules
//!
//! - Labels and keywords are folded before comparison: lowercased, Greek
//!   tonos/dialytika removed, final sigma mapped to `σ`.
//! - The table is scanned top to bottom and the first substring hit wins.
//!   Amendment and voted-text keywords come before the generic "νόμου" so
//!   "Τροπολογία επί του σχεδίου νόμου" is an amendment, not law text.

use serde::{Deserialize, Serialize};

/// Category of a document attached to a law.
///
/// Declaration order is the order sections appear in the evidence bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentCategory {
    PrincipalLawText,
    VotedText,
    Amendment,
    CommitteeReport,
    Consultation,
    Other,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 6] = [
        Self::PrincipalLawText,
        Self::VotedText,
        Self::Amendment,
        Self::CommitteeReport,
        Self::Consultation,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrincipalLawText => "principal_law_text",
            Self::VotedText => "voted_text",
            Self::Amendment => "amendment",
            Self::CommitteeReport => "committee_report",
            Self::Consultation => "consultation",
            Self::Other => "other",
        }
    }

    /// Human-readable label used in evidence section headers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PrincipalLawText => "Principal law text",
            Self::VotedText => "Voted text",
            Self::Amendment => "Amendment",
            Self::CommitteeReport => "Committee report",
            Self::Consultation => "Consultation",
            Self::Other => "Other document",
        }
    }

    /// Categorize a source label, falling back to [`Other`](Self::Other).
    pub fn from_label(label: &str) -> Self {
        categorize(label).unwrap_or(Self::Other)
    }
}

impl std::fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword → category table, consulted in order.
pub const CATEGORY_KEYWORDS: &[(&str, DocumentCategory)] = &[
    ("τροπολογ", DocumentCategory::Amendment),
    ("amendment", DocumentCategory::Amendment),
    ("ψηφισθέν", DocumentCategory::VotedText),
    ("ψηφισθεν", DocumentCategory::VotedText),
    ("voted", DocumentCategory::VotedText),
    ("διαβούλευσ", DocumentCategory::Consultation),
    ("consultation", DocumentCategory::Consultation),
    ("έκθεσ", DocumentCategory::CommitteeReport),
    ("αιτιολογικ", DocumentCategory::CommitteeReport),
    ("συνεπειών", DocumentCategory::CommitteeReport),
    ("γλκ", DocumentCategory::CommitteeReport),
    ("πόρισμα", DocumentCategory::CommitteeReport),
    ("report", DocumentCategory::CommitteeReport),
    ("φεκ", DocumentCategory::PrincipalLawText),
    ("σχέδιο νόμου", DocumentCategory::PrincipalLawText),
    ("πρόταση νόμου", DocumentCategory::PrincipalLawText),
    ("νόμου", DocumentCategory::PrincipalLawText),
    ("νόμος", DocumentCategory::PrincipalLawText),
    ("law text", DocumentCategory::PrincipalLawText),
    ("bill", DocumentCategory::PrincipalLawText),
];

/// Look up a label in [`CATEGORY_KEYWORDS`]. `None` when nothing matches.
pub fn categorize(label: &str) -> Option<DocumentCategory> {
    let folded = fold(label);
    if folded.trim().is_empty() {
        return None;
    }
    CATEGORY_KEYWORDS
        .iter()
        .find(|(keyword, _)| folded.contains(&fold(keyword)))
        .map(|(_, category)| *category)
}

/// Lowercase and strip Greek accents so "ΈΚΘΕΣΗ", "Έκθεση" and "εκθεση" compare equal.
pub fn fold(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'ά' => 'α',
            'έ' => 'ε',
            'ή' => 'η',
            'ί' | 'ϊ' | 'ΐ' => 'ι',
            'ό' => 'ο',
            'ύ' | 'ϋ' | 'ΰ' => 'υ',
            'ώ' => 'ω',
            'ς' => 'σ',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_file_types() {
        assert_eq!(
            categorize("Ψηφισθέν κείμενο"),
            Some(DocumentCategory::VotedText)
        );
        assert_eq!(
            categorize("Αιτιολογική Έκθεση"),
            Some(DocumentCategory::CommitteeReport)
        );
        assert_eq!(
            categorize("Έκθεση Γενικού Λογιστηρίου (ΓΛΚ)"),
            Some(DocumentCategory::CommitteeReport)
        );
        assert_eq!(
            categorize("Σχέδιο νόμου"),
            Some(DocumentCategory::PrincipalLawText)
        );
    }

    #[test]
    fn gazette_copy_is_principal_text() {
        assert_eq!(
            categorize("Φωτοτυπία ΦΕΚ"),
            Some(DocumentCategory::PrincipalLawText)
        );
        assert_eq!(
            categorize("Τροπολογία (ΦΕΚ Α 12)"),
            Some(DocumentCategory::Amendment)
        );
    }

    #[test]
    fn amendment_wins_over_law_keyword() {
        assert_eq!(
            categorize("Τροπολογία επί του σχεδίου νόμου"),
            Some(DocumentCategory::Amendment)
        );
    }

    #[test]
    fn voted_text_wins_over_law_keyword() {
        assert_eq!(
            categorize("Ψηφισθέν κείμενο νόμου"),
            Some(DocumentCategory::VotedText)
        );
    }

    #[test]
    fn accents_and_case_ignored() {
        assert_eq!(categorize("ΨΗΦΙΣΘΕΝ"), categorize("ψηφισθέν"));
        assert_eq!(categorize("εκθεση"), Some(DocumentCategory::CommitteeReport));
        assert_eq!(categorize("ΕΚΘΕΣΗ ΣΥΝΕΠΕΙΩΝ ΡΥΘΜΙΣΗΣ"), Some(DocumentCategory::CommitteeReport));
    }

    #[test]
    fn unmatched_label_is_other() {
        assert_eq!(categorize("Πίνακας"), None);
        assert_eq!(categorize(""), None);
        assert_eq!(DocumentCategory::from_label("Πίνακας"), DocumentCategory::Other);
    }

    #[test]
    fn english_labels() {
        assert_eq!(categorize("Committee Report"), Some(DocumentCategory::CommitteeReport));
        assert_eq!(categorize("Amendments"), Some(DocumentCategory::Amendment));
    }

    #[test]
    fn fold_final_sigma() {
        assert_eq!(fold("Νόμος"), "νομοσ");
    }

    #[test]
    fn category_serializes_screaming_case() {
        let json = serde_json::to_string(&DocumentCategory::PrincipalLawText).unwrap();
        assert_eq!(json, "\"PRINCIPAL_LAW_TEXT\"");
    }
}
