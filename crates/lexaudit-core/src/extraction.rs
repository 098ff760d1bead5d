use serde::{Deserialize, Serialize};

use crate::text::char_len;

/// Extracted text must be longer than this (in characters) to count as a
/// machine-readable document. Shorter output means a scanned PDF.
pub const SUBSTANTIVE_THRESHOLD: usize = 500;

/// How a document's text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionMode {
    Text,
    Ocr,
    Failed,
}

/// Outcome of processing one document. `text` is empty iff `mode` is `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub mode: ExtractionMode,
    pub text: String,
}

impl ExtractionResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_mode(ExtractionMode::Text, text.into())
    }

    pub fn ocr(text: impl Into<String>) -> Self {
        Self::with_mode(ExtractionMode::Ocr, text.into())
    }

    pub fn failed() -> Self {
        Self {
            mode: ExtractionMode::Failed,
            text: String::new(),
        }
    }

    // Empty text always degrades to Failed.
    fn with_mode(mode: ExtractionMode, text: String) -> Self {
        if text.is_empty() {
            return Self::failed();
        }
        Self { mode, text }
    }

    pub fn is_failed(&self) -> bool {
        self.mode == ExtractionMode::Failed
    }
}

/// Whether extracted text is long enough to skip OCR.
pub fn is_substantive(text: &str) -> bool {
    char_len(text) > SUBSTANTIVE_THRESHOLD
}
