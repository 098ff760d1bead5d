//! Gemini REST implementation of [`ReasoningCapability`].
//!
//! - `POST {base}/models/{model}:generateContent` for generation
//! - `POST {upload}/files` (resumable protocol: a `start` request carrying
//!   the display name, then one `upload, finalize` request with the bytes)
//! - `GET {base}/files/{id}` for processing state

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capability::{
    AiError, FileHandle, FileState, GenerateRequest, Part, ReasoningCapability,
};

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub upload_url: String,
    /// Generation over large documents is slow; this bounds a single call.
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            upload_url: "https://generativelanguage.googleapis.com/upload/v1beta".to_string(),
            timeout: Duration::from_secs(600),
        }
    }
}

pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, AiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config: GeminiConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                upload_url: config.upload_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    fn model_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{model}:generateContent", self.config.base_url)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, AiError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

// ── Wire types ──

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePart<'a> {
    Text {
        text: &'a str,
    },
    File {
        #[serde(rename = "fileData")]
        file_data: FileData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Serialize)]
struct UploadMetadata<'a> {
    file: UploadFile<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadFile<'a> {
    display_name: &'a str,
}

fn upload_metadata(display_name: &str) -> UploadMetadata<'_> {
    UploadMetadata {
        file: UploadFile { display_name },
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    file: WireFile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFile {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    state: String,
}

fn to_wire(part: &Part) -> WirePart<'_> {
    match part {
        Part::Text(text) => WirePart::Text { text },
        Part::File { uri, mime_type } => WirePart::File {
            file_data: FileData {
                mime_type,
                file_uri: uri,
            },
        },
    }
}

fn build_body(request: &GenerateRequest) -> GenerateBody<'_> {
    GenerateBody {
        system_instruction: request.system_prompt.as_deref().map(|text| Content {
            role: None,
            parts: vec![WirePart::Text { text }],
        }),
        contents: vec![Content {
            role: Some("user"),
            parts: request.parts.iter().map(to_wire).collect(),
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            response_mime_type: request.json_output.then_some("application/json"),
        },
    }
}

fn response_text(resp: GenerateResponse) -> Result<String, AiError> {
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(AiError::Empty("no candidate text".to_string()));
    }
    Ok(text)
}

fn parse_state(state: &str) -> FileState {
    match state {
        "ACTIVE" => FileState::Active,
        "FAILED" => FileState::Failed,
        _ => FileState::Processing,
    }
}

#[async_trait]
impl ReasoningCapability for GeminiClient {
    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<String, AiError> {
        let url = self.model_url(model);
        info!(model, parts = request.parts.len(), "generating content");
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&build_body(request))
            .send()
            .await?;
        let resp: GenerateResponse = Self::check(resp).await?.json().await?;
        let text = response_text(resp)?;
        debug!(model, chars = text.len(), "generation complete");
        Ok(text)
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<FileHandle, AiError> {
        let url = format!("{}/files", self.config.upload_url);
        info!(display_name, bytes = bytes.len(), "uploading file");
        let start = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&upload_metadata(display_name))
            .send()
            .await?;
        let start = Self::check(start).await?;
        let session = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AiError::Empty("upload session URL missing".to_string()))?
            .to_string();

        let resp = self
            .client
            .post(&session)
            .header("x-goog-api-key", &self.config.api_key)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .body(bytes)
            .send()
            .await?;
        let resp: UploadResponse = Self::check(resp).await?.json().await?;
        debug!(file = %resp.file.name, display_name, "upload finalized");
        Ok(FileHandle {
            name: resp.file.name,
            uri: resp.file.uri,
            mime_type: if resp.file.mime_type.is_empty() {
                mime_type.to_string()
            } else {
                resp.file.mime_type
            },
        })
    }

    async fn file_state(&self, file: &FileHandle) -> Result<FileState, AiError> {
        let url = format!("{}/{}", self.config.base_url, file.name);
        let resp = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await?;
        let wire: WireFile = Self::check(resp).await?.json().await?;
        debug!(file = %wire.name, state = %wire.state, "file state");
        Ok(parse_state(&wire.state))
    }
}
