//! The reasoning capability the pipeline depends on.
//!
//! Two modes: plain generation from text/file parts, and binary upload with
//! asynchronous server-side processing whose state is polled before the file
//! can be referenced in a prompt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response: {0}")]
    Empty(String),
}

/// One piece of prompt content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    File { uri: String, mime_type: String },
}

impl Part {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn file(handle: &FileHandle) -> Self {
        Self::File {
            uri: handle.uri.clone(),
            mime_type: handle.mime_type.clone(),
        }
    }
}

/// A generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub system_prompt: Option<String>,
    pub parts: Vec<Part>,
    pub temperature: f32,
    /// Ask the model for a bare JSON response.
    pub json_output: bool,
}

impl GenerateRequest {
    pub fn new(parts: Vec<Part>) -> Self {
        Self {
            system_prompt: None,
            parts,
            temperature: 0.0,
            json_output: false,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// An uploaded artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    /// Server-side resource name, used for state polling.
    pub name: String,
    /// URI used to reference the file in prompts.
    pub uri: String,
    pub mime_type: String,
}

/// Server-side processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Processing,
    Active,
    Failed,
}

impl FileState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

#[async_trait]
pub trait ReasoningCapability: Send + Sync {
    /// Run a generation request, returning the response text.
    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<String, AiError>;

    /// Upload bytes for later reference in prompts.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<FileHandle, AiError>;

    /// Current processing state of an uploaded file.
    async fn file_state(&self, file: &FileHandle) -> Result<FileState, AiError>;
}
