//! Request orchestration: one query in, one scored audit report out.
//!
//! locate → fetch (bounded, order-preserving) → extract → OCR if scanned →
//! aggregate with the consultation → audit.

mod error;
mod report;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use lexaudit_ai::{AuditInvoker, OcrBridge, TextExtractor};
use lexaudit_core::{
    Attachment, DEFAULT_MAX_CATEGORY_CHARS, DocumentRef, EvidenceAggregator, ExtractionResult,
    LawQuery, Rubric, is_substantive,
};
use lexaudit_source::{ConsultationFinder, DocumentSource, LawLocator};
use tracing::{info, warn};

pub use error::PipelineError;
pub use report::{AuditReport, DocumentOutcome};

/// What to do with documents whose text layer is too short.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OcrStrategy {
    /// Transcribe each scan separately, then audit the text.
    #[default]
    Transcribe,
    /// Upload scans and hand them to the audit request as file parts.
    AttachToAudit,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Documents processed at once.
    pub concurrency: usize,
    pub ocr_strategy: OcrStrategy,
    /// Bound on the whole request.
    pub deadline: Option<Duration>,
    pub max_category_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            ocr_strategy: OcrStrategy::Transcribe,
            deadline: None,
            max_category_chars: DEFAULT_MAX_CATEGORY_CHARS,
        }
    }
}

/// The pipeline's collaborators.
pub struct Components {
    pub locator: LawLocator,
    pub documents: Arc<dyn DocumentSource>,
    pub extractor: TextExtractor,
    pub ocr: OcrBridge,
    pub consultations: ConsultationFinder,
    pub invoker: AuditInvoker,
}

/// Runs audit requests. Holds no per-request state.
pub struct Auditor {
    parts: Components,
    aggregator: EvidenceAggregator,
    rubric: Rubric,
    config: PipelineConfig,
}

struct Processed {
    result: ExtractionResult,
    attachment: Option<Attachment>,
    error: Option<String>,
}

impl Auditor {
    pub fn new(parts: Components, rubric: Rubric, config: PipelineConfig) -> Self {
        Self {
            aggregator: EvidenceAggregator::new(config.max_category_chars),
            parts,
            rubric,
            config,
        }
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    /// Audit the law matching `query` (and/or found at `direct_url`).
    pub async fn run(
        &self,
        query: Option<&LawQuery>,
        direct_url: Option<&str>,
    ) -> Result<AuditReport, PipelineError> {
        match self.config.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.run_inner(query, direct_url))
                .await
                .map_err(|_| PipelineError::DeadlineExceeded(deadline))?,
            None => self.run_inner(query, direct_url).await,
        }
    }

    async fn run_inner(
        &self,
        query: Option<&LawQuery>,
        direct_url: Option<&str>,
    ) -> Result<AuditReport, PipelineError> {
        let record = self.parts.locator.locate(query, direct_url).await?;
        if !record.has_documents() {
            return Err(PipelineError::NoDocuments {
                title: record.title,
            });
        }

        info!(
            title = %record.title,
            documents = record.documents.len(),
            concurrency = self.config.concurrency,
            "processing documents"
        );

        let documents = stream::iter(record.documents.iter())
            .map(|doc| self.process(doc))
            .buffered(self.config.concurrency.max(1))
            .collect::<Vec<_>>();
        let (processed, consultation) =
            tokio::join!(documents, self.parts.consultations.find(&record.title));

        let results: Vec<ExtractionResult> = processed.iter().map(|p| p.result.clone()).collect();
        let mut bundle = self.aggregator.aggregate(&record, &results, consultation);
        bundle.attachments = processed
            .iter()
            .filter_map(|p| p.attachment.clone())
            .collect();

        if bundle.is_empty() {
            warn!(title = %record.title, "no document yielded text");
            return Err(PipelineError::NoDocuments {
                title: record.title,
            });
        }

        let verdict = self.parts.invoker.audit(&bundle, &self.rubric).await?;

        let documents = record
            .documents
            .iter()
            .zip(processed)
            .map(|(doc, p)| DocumentOutcome {
                url: doc.url.clone(),
                category: doc.category,
                description: doc.description.clone(),
                mode: p.result.mode,
                chars: p.result.text.chars().count(),
                attached: p.attachment.is_some(),
                error: p.error,
            })
            .collect();

        Ok(AuditReport {
            consultation_url: bundle.consultation_url.clone(),
            consultation_dates: bundle.consultation_dates.clone(),
            record,
            documents,
            rubric: self.rubric.name.clone(),
            verdict,
            generated_at: chrono::Utc::now(),
        })
    }

    async fn process(&self, doc: &DocumentRef) -> Processed {
        let bytes = match self.parts.documents.fetch(doc).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Processed {
                    result: ExtractionResult::failed(),
                    attachment: None,
                    error: Some(e.to_string()),
                };
            }
        };

        let extractor = self.parts.extractor;
        let (bytes, text) = match tokio::task::spawn_blocking(move || {
            let text = extractor.extract_text(&bytes);
            (bytes, text)
        })
        .await
        {
            Ok(pair) => pair,
            Err(e) => {
                warn!(url = %doc.url, error = %e, "extraction task failed");
                return Processed {
                    result: ExtractionResult::failed(),
                    attachment: None,
                    error: Some(format!("extraction task failed: {e}")),
                };
            }
        };

        if is_substantive(&text) || self.config.ocr_strategy == OcrStrategy::Transcribe {
            let result = self.parts.ocr.classify_and_recover(&bytes, &text).await;
            let error = result
                .is_failed()
                .then(|| "no text layer and OCR produced nothing".to_string());
            return Processed {
                result,
                attachment: None,
                error,
            };
        }

        let name = display_name(doc);
        match self.parts.ocr.upload_and_wait(bytes, &name).await {
            Ok(file) => {
                info!(url = %doc.url, file = %file.name, "scan attached to audit");
                Processed {
                    result: ExtractionResult::failed(),
                    attachment: Some(Attachment {
                        category: doc.category,
                        description: doc.description.clone(),
                        file_uri: file.uri,
                        mime_type: file.mime_type,
                    }),
                    error: None,
                }
            }
            Err(e) => {
                warn!(url = %doc.url, error = %e, "attaching scan failed");
                Processed {
                    result: ExtractionResult::failed(),
                    attachment: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

fn display_name(doc: &DocumentRef) -> String {
    doc.url
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("document.pdf")
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use lexaudit_ai::testing::pdf_with_pages;
    use lexaudit_ai::{
        AiError, AuditConfig, FileHandle, FileState, GenerateRequest, OcrConfig, Part,
        ReasoningCapability,
    };
    use lexaudit_core::{DocumentCategory, ExtractionMode};
    use lexaudit_source::parliament::{ApiFile, ApiLaw};
    use lexaudit_source::{
        ConsultationConfig, FetchError, LawApi, LocatorConfig, PageSource, SourceError, WebSearch,
    };

    use super::*;

    struct FakeApi(Vec<ApiLaw>);

    #[async_trait]
    impl LawApi for FakeApi {
        async fn search(&self, _query: &LawQuery) -> Result<Vec<ApiLaw>, SourceError> {
            Ok(self.0.clone())
        }
    }

    struct NoPages;

    #[async_trait]
    impl PageSource for NoPages {
        async fn fetch_page(&self, _url: &str) -> Result<String, SourceError> {
            Err(SourceError::Server {
                status: 404,
                body: String::new(),
            })
        }
    }

    struct NoSearch;

    #[async_trait]
    impl WebSearch for NoSearch {
        async fn search(&self, _query: &str) -> Result<Vec<String>, SourceError> {
            Err(SourceError::Server {
                status: 429,
                body: String::new(),
            })
        }
    }

    /// Serves `pdfs` where present and scan-like bytes otherwise; URLs in
    /// `failing` return an error, and `delay` stalls every fetch.
    struct FakeDocuments {
        pdfs: HashMap<String, Vec<u8>>,
        failing: HashSet<String>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl DocumentSource for FakeDocuments {
        async fn fetch(&self, doc: &DocumentRef) -> Result<Vec<u8>, FetchError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.contains(&doc.url) {
                return Err(FetchError::new(&doc.url, "server returned 500"));
            }
            if let Some(pdf) = self.pdfs.get(&doc.url) {
                return Ok(pdf.clone());
            }
            Ok(format!("scan of {}", doc.url).into_bytes())
        }
    }

    /// Transcribes every upload; answers audit requests with a fixed verdict.
    struct FakeModel {
        audit_reply: String,
        audit_requests: Mutex<Vec<GenerateRequest>>,
        uploads: AtomicUsize,
    }

    #[async_trait]
    impl ReasoningCapability for FakeModel {
        async fn generate(&self, _model: &str, request: &GenerateRequest) -> Result<String, AiError> {
            if request.json_output {
                self.audit_requests.lock().unwrap().push(request.clone());
                return Ok(self.audit_reply.clone());
            }
            match &request.parts[0] {
                Part::File { uri, .. } => Ok(format!("Μεταγραφή του {uri}")),
                Part::Text(_) => Err(AiError::Empty("no file".into())),
            }
        }

        async fn upload(
            &self,
            _bytes: Vec<u8>,
            mime_type: &str,
            display_name: &str,
        ) -> Result<FileHandle, AiError> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(FileHandle {
                name: format!("files/{display_name}"),
                uri: format!("https://files/{display_name}"),
                mime_type: mime_type.to_string(),
            })
        }

        async fn file_state(&self, _file: &FileHandle) -> Result<FileState, AiError> {
            Ok(FileState::Active)
        }
    }

    fn verdict_json() -> String {
        let values = [1.0, 1.0, 0.5, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.5];
        let criteria: Vec<serde_json::Value> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                serde_json::json!({
                    "id": (i + 1).to_string(),
                    "title": format!("κριτήριο {}", i + 1),
                    "score_val": v,
                    "reason": "",
                })
            })
            .collect();
        serde_json::json!({ "criteria": criteria, "summary": "Σύνοψη" }).to_string()
    }

    fn file(url: &str, file_type: &str) -> ApiFile {
        ApiFile {
            file: Some(url.into()),
            file_type: file_type.into(),
            description: String::new(),
        }
    }

    fn law(files: Vec<ApiFile>) -> ApiLaw {
        ApiLaw {
            title: "Ενίσχυση της διαφάνειας".into(),
            law_number: Some("4940".into()),
            reports: files,
            ..ApiLaw::default()
        }
    }

    struct Setup {
        laws: Vec<ApiLaw>,
        pdfs: Vec<(&'static str, Vec<u8>)>,
        failing: Vec<&'static str>,
        delay: Option<Duration>,
        config: PipelineConfig,
    }

    impl Default for Setup {
        fn default() -> Self {
            Self {
                laws: vec![law(vec![
                    file("/UserFiles/a.pdf", "Σχέδιο νόμου"),
                    file("/UserFiles/b.pdf", "Αιτιολογική έκθεση"),
                    file("/UserFiles/c.pdf", "Τροπολογία"),
                ])],
                pdfs: Vec::new(),
                failing: Vec::new(),
                delay: None,
                config: PipelineConfig::default(),
            }
        }
    }

    fn auditor(setup: Setup) -> (Auditor, Arc<FakeModel>) {
        let model = Arc::new(FakeModel {
            audit_reply: verdict_json(),
            audit_requests: Mutex::new(Vec::new()),
            uploads: AtomicUsize::new(0),
        });
        let pages: Arc<dyn PageSource> = Arc::new(NoPages);
        let parts = Components {
            locator: LawLocator::new(
                Arc::new(FakeApi(setup.laws)),
                pages.clone(),
                LocatorConfig::default(),
            ),
            documents: Arc::new(FakeDocuments {
                pdfs: setup
                    .pdfs
                    .into_iter()
                    .map(|(url, bytes)| (url.to_string(), bytes))
                    .collect(),
                failing: setup.failing.into_iter().map(String::from).collect(),
                delay: setup.delay,
            }),
            extractor: TextExtractor::new(),
            ocr: OcrBridge::new(
                model.clone(),
                OcrConfig {
                    poll_interval: Duration::from_millis(1),
                    ..OcrConfig::default()
                },
            ),
            consultations: ConsultationFinder::new(
                Arc::new(NoSearch),
                pages,
                ConsultationConfig::default(),
            ),
            invoker: AuditInvoker::new(model.clone(), AuditConfig::default()),
        };
        (Auditor::new(parts, Rubric::default(), setup.config), model)
    }

    fn query() -> LawQuery {
        LawQuery::parse("4940/2022").unwrap()
    }

    #[tokio::test]
    async fn scanned_documents_are_transcribed_and_scored() {
        let (auditor, model) = auditor(Setup::default());
        let report = auditor.run(Some(&query()), None).await.unwrap();

        assert_eq!(report.verdict.total_score, 55.0);
        assert_eq!(report.count(ExtractionMode::Ocr), 3);
        assert!(report.consultation_url.is_none());

        let requests = model.audit_requests.lock().unwrap();
        let text: String = requests[0]
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::File { .. } => None,
            })
            .collect();
        assert_eq!(text.matches("Μεταγραφή").count(), 3);
        assert!(text.contains("Ενίσχυση της διαφάνειας"));
    }

    #[tokio::test]
    async fn text_layer_skips_ocr() {
        let clause = "Article 1 sets out the obligations of public bodies. ".repeat(12);
        let (auditor, model) = auditor(Setup {
            laws: vec![law(vec![file("/UserFiles/a.pdf", "Σχέδιο νόμου")])],
            pdfs: vec![(
                "/UserFiles/a.pdf",
                pdf_with_pages(&[clause.as_str(), "Article 2 enters into force."]),
            )],
            ..Setup::default()
        });
        let report = auditor.run(Some(&query()), None).await.unwrap();

        assert_eq!(report.documents[0].mode, ExtractionMode::Text);
        assert!(report.documents[0].chars > 500);
        assert_eq!(model.uploads.load(Ordering::SeqCst), 0);

        let requests = model.audit_requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let text: String = requests[0]
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::File { .. } => None,
            })
            .collect();
        assert!(text.contains("Article 2 enters into force."));
        assert!(!text.contains("Μεταγραφή"));
    }

    #[tokio::test]
    async fn failed_fetch_does_not_abort_others() {
        let (auditor, _) = auditor(Setup {
            failing: vec!["/UserFiles/b.pdf"],
            ..Setup::default()
        });
        let report = auditor.run(Some(&query()), None).await.unwrap();

        let modes: Vec<ExtractionMode> = report.documents.iter().map(|d| d.mode).collect();
        assert_eq!(
            modes,
            vec![ExtractionMode::Ocr, ExtractionMode::Failed, ExtractionMode::Ocr]
        );
        assert!(report.documents[1].error.as_deref().unwrap().contains("500"));
        assert_eq!(report.documents[2].category, DocumentCategory::Amendment);
    }

    #[tokio::test]
    async fn nothing_fetchable_is_no_documents() {
        let (auditor, model) = auditor(Setup {
            failing: vec!["/UserFiles/a.pdf", "/UserFiles/b.pdf", "/UserFiles/c.pdf"],
            ..Setup::default()
        });
        let err = auditor.run(Some(&query()), None).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoDocuments { .. }));
        assert!(model.audit_requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_without_documents_is_no_documents() {
        let (auditor, _) = auditor(Setup {
            laws: vec![law(Vec::new())],
            ..Setup::default()
        });
        let err = auditor.run(Some(&query()), None).await.unwrap_err();
        assert_eq!(err.stage(), "document retrieval");
    }

    #[tokio::test]
    async fn unknown_law_is_not_found() {
        let (auditor, _) = auditor(Setup {
            laws: Vec::new(),
            ..Setup::default()
        });
        let err = auditor.run(Some(&query()), None).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
        assert!(err.hint().unwrap().contains("--url"));
    }

    #[tokio::test]
    async fn identical_inputs_score_identically() {
        let (auditor, _) = auditor(Setup::default());
        let a = auditor.run(Some(&query()), None).await.unwrap();
        let b = auditor.run(Some(&query()), None).await.unwrap();
        assert_eq!(a.verdict.total_score, b.verdict.total_score);
        assert_eq!(a.documents, b.documents);
    }

    #[tokio::test]
    async fn attach_mode_passes_files_to_audit() {
        let (auditor, model) = auditor(Setup {
            config: PipelineConfig {
                ocr_strategy: OcrStrategy::AttachToAudit,
                ..PipelineConfig::default()
            },
            ..Setup::default()
        });
        let report = auditor.run(Some(&query()), None).await.unwrap();
        assert!(report.documents.iter().all(|d| d.attached));

        let requests = model.audit_requests.lock().unwrap();
        let files = requests[0]
            .parts
            .iter()
            .filter(|p| matches!(p, Part::File { .. }))
            .count();
        assert_eq!(files, 3);
    }

    #[tokio::test]
    async fn deadline_expiry_is_reported() {
        let (auditor, _) = auditor(Setup {
            delay: Some(Duration::from_secs(30)),
            config: PipelineConfig {
                deadline: Some(Duration::from_millis(20)),
                ..PipelineConfig::default()
            },
            ..Setup::default()
        });
        let err = auditor.run(Some(&query()), None).await.unwrap_err();
        assert!(matches!(err, PipelineError::DeadlineExceeded(_)));
        assert_eq!(err.stage(), "deadline");
    }

    #[test]
    fn display_name_from_url() {
        let doc = DocumentRef::new("/UserFiles/x/y.pdf", DocumentCategory::Other, "");
        assert_eq!(display_name(&doc), "y.pdf");
        let doc = DocumentRef::new("/dir/", DocumentCategory::Other, "");
        assert_eq!(display_name(&doc), "document.pdf");
    }
}
