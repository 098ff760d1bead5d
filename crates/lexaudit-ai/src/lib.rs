//! Document intelligence: PDF text extraction, OCR through the reasoning
//! capability, and the rubric audit.

pub mod audit;
pub mod capability;
pub mod extract;
pub mod gemini;
pub mod ocr;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use audit::{AuditConfig, AuditError, AuditInvoker};
pub use capability::{AiError, FileHandle, FileState, GenerateRequest, Part, ReasoningCapability};
pub use extract::TextExtractor;
pub use gemini::{GeminiClient, GeminiConfig};
pub use ocr::{OcrBridge, OcrConfig, OcrFailure};
