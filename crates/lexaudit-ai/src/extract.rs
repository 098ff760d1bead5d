//! PDF text-layer extraction.

use std::panic::{AssertUnwindSafe, catch_unwind};

use lexaudit_core::text::{char_len, collapse_whitespace};
use tracing::{debug, warn};

/// Extracts the embedded text layer of a PDF.
///
/// Synchronous and CPU-bound; async callers should run it on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractor {
    /// Stop after this many pages. `None` reads the whole document.
    pub max_pages: Option<usize>,
}

impl TextExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_pages(mut self, pages: usize) -> Self {
        self.max_pages = Some(pages);
        self
    }

    /// Page texts in order, joined and whitespace-collapsed.
    ///
    /// Never fails: anything the parser rejects (or panics on) yields `""`.
    pub fn extract_text(&self, bytes: &[u8]) -> String {
        if !looks_like_pdf(bytes) {
            warn!(bytes = bytes.len(), "not a PDF, skipping text extraction");
            return String::new();
        }

        let pages = match catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        })) {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => {
                warn!(error = %e, "PDF text extraction failed");
                return String::new();
            }
            Err(_) => {
                warn!("PDF parser panicked");
                return String::new();
            }
        };

        let total = pages.len();
        let limit = self.max_pages.unwrap_or(total);
        let joined = pages.into_iter().take(limit).collect::<Vec<_>>().join(" ");
        let text = collapse_whitespace(&joined);
        debug!(
            pages = total.min(limit),
            total_pages = total,
            chars = char_len(&text),
            "extracted text layer"
        );
        text
    }
}

fn looks_like_pdf(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"%PDF")
}
