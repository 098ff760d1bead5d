//! Scan classification and OCR recovery.
//!
//! A document whose text layer is too short is treated as a scan: its bytes
//! are uploaded to the reasoning capability, the upload is polled until the
//! server finishes processing it, and the model is asked for a transcription.

use std::sync::Arc;
use std::time::Duration;

use lexaudit_core::{ExtractionResult, is_substantive};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::capability::{
    AiError, FileHandle, FileState, GenerateRequest, Part, ReasoningCapability,
};

pub const PDF_MIME: &str = "application/pdf";

const TRANSCRIBE_PROMPT: &str = "Μεταγράψτε πλήρως και αυτολεξεί το κείμενο αυτού του \
εγγράφου. Επιστρέψτε μόνο το κείμενο, χωρίς σχόλια ή περιλήψεις.";

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub model: String,
    pub poll_interval: Duration,
    /// Upper bound on state polls; running out counts as failure.
    pub max_polls: u32,
    pub prompt: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            poll_interval: Duration::from_secs(2),
            max_polls: 90,
            prompt: TRANSCRIBE_PROMPT.to_string(),
        }
    }
}

/// Why recovery did not produce text. Contained: callers see `Failed`.
#[derive(Error, Debug)]
pub enum OcrFailure {
    #[error("upload failed: {0}")]
    Upload(#[source] AiError),
    #[error("state poll failed: {0}")]
    Poll(#[source] AiError),
    #[error("file processing failed on the server")]
    Rejected,
    #[error("file still processing after {polls} polls")]
    TimedOut { polls: u32 },
    #[error("transcription failed: {0}")]
    Transcribe(#[source] AiError),
    #[error("empty transcription")]
    Empty,
}

pub struct OcrBridge {
    capability: Arc<dyn ReasoningCapability>,
    config: OcrConfig,
}

impl OcrBridge {
    pub fn new(capability: Arc<dyn ReasoningCapability>, config: OcrConfig) -> Self {
        Self { capability, config }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Keep substantive extracted text; otherwise try OCR.
    pub async fn classify_and_recover(&self, bytes: &[u8], extracted: &str) -> ExtractionResult {
        if is_substantive(extracted) {
            return ExtractionResult::text(extracted);
        }

        info!(
            chars = extracted.chars().count(),
            bytes = bytes.len(),
            "text layer too short, attempting OCR"
        );
        match self.transcribe(bytes).await {
            Ok(text) => ExtractionResult::ocr(text),
            Err(e) => {
                warn!(error = %e, "OCR failed");
                ExtractionResult::failed()
            }
        }
    }

    async fn transcribe(&self, bytes: &[u8]) -> Result<String, OcrFailure> {
        let file = self.upload_and_wait(bytes.to_vec(), "scanned-document.pdf").await?;
        let request = GenerateRequest::new(vec![
            Part::file(&file),
            Part::text(self.config.prompt.clone()),
        ]);
        let text = self
            .capability
            .generate(&self.config.model, &request)
            .await
            .map_err(OcrFailure::Transcribe)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(OcrFailure::Empty);
        }
        Ok(text.to_string())
    }

    /// Upload a PDF and wait until it can be referenced in a prompt.
    pub async fn upload_and_wait(
        &self,
        bytes: Vec<u8>,
        display_name: &str,
    ) -> Result<FileHandle, OcrFailure> {
        let file = self
            .capability
            .upload(bytes, PDF_MIME, display_name)
            .await
            .map_err(OcrFailure::Upload)?;
        debug!(file = %file.name, "uploaded, waiting for processing");

        for poll in 1..=self.config.max_polls {
            match self
                .capability
                .file_state(&file)
                .await
                .map_err(OcrFailure::Poll)?
            {
                FileState::Active => {
                    debug!(file = %file.name, polls = poll, "file active");
                    return Ok(file);
                }
                FileState::Failed => return Err(OcrFailure::Rejected),
                FileState::Processing => {}
            }
            if poll < self.config.max_polls {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }
        Err(OcrFailure::TimedOut {
            polls: self.config.max_polls,
        })
    }
}
