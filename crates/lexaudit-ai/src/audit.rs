//! Audit invocation: evidence bundle + rubric → scored [`Verdict`].
//!
//! One composite request per law. The model must answer with a bare JSON
//! object; code fences are tolerated. If the primary model's answer cannot be
//! used, the same request is sent once to the fallback model.

use std::collections::HashMap;
use std::sync::Arc;

use lexaudit_core::{
    CriterionScore, DocumentCategory, EvidenceBundle, Rubric, Verdict, is_valid_score,
};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

use crate::capability::{GenerateRequest, Part, ReasoningCapability};

/// Characters of the raw response kept in log lines.
const RAW_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub primary_model: String,
    pub fallback_model: Option<String>,
    pub temperature: f32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            primary_model: "gemini-2.0-flash".to_string(),
            fallback_model: Some("gemini-2.0-flash-exp".to_string()),
            temperature: 0.0,
        }
    }
}

/// Both attempts failed. `raw` holds the last response text, if any arrived.
#[derive(Error, Debug, Clone)]
#[error("audit failed: {reason}")]
pub struct AuditError {
    pub reason: String,
    pub raw: Option<String>,
}

pub struct AuditInvoker {
    capability: Arc<dyn ReasoningCapability>,
    config: AuditConfig,
}

impl AuditInvoker {
    pub fn new(capability: Arc<dyn ReasoningCapability>, config: AuditConfig) -> Self {
        Self { capability, config }
    }

    pub async fn audit(
        &self,
        bundle: &EvidenceBundle,
        rubric: &Rubric,
    ) -> Result<Verdict, AuditError> {
        let request = build_request(bundle, rubric, self.config.temperature);
        info!(
            law = %bundle.metadata.title,
            evidence_chars = bundle.total_chars(),
            attachments = bundle.attachments.len(),
            "requesting audit"
        );

        let primary = self.attempt(&self.config.primary_model, &request, rubric).await;
        let first = match primary {
            Ok(verdict) => return Ok(verdict),
            Err(e) => e,
        };

        let Some(fallback) = self.config.fallback_model.as_deref() else {
            return Err(first);
        };
        warn!(
            model = %self.config.primary_model,
            fallback,
            reason = %first.reason,
            "primary audit attempt failed, retrying"
        );

        self.attempt(fallback, &request, rubric)
            .await
            .map_err(|second| AuditError {
                reason: format!("primary: {}; fallback: {}", first.reason, second.reason),
                raw: second.raw.or(first.raw),
            })
    }

    async fn attempt(
        &self,
        model: &str,
        request: &GenerateRequest,
        rubric: &Rubric,
    ) -> Result<Verdict, AuditError> {
        let raw = self
            .capability
            .generate(model, request)
            .await
            .map_err(|e| AuditError {
                reason: format!("{model}: {e}"),
                raw: None,
            })?;

        match parse_verdict(&raw, rubric, model) {
            Ok(verdict) => {
                info!(model, total_score = verdict.total_score, "audit complete");
                Ok(verdict)
            }
            Err(reason) => {
                let preview: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
                warn!(model, %reason, raw = %preview, "unusable audit response");
                Err(AuditError {
                    reason: format!("{model}: {reason}"),
                    raw: Some(raw),
                })
            }
        }
    }
}

/// Assemble the composite audit request.
pub fn build_request(
    bundle: &EvidenceBundle,
    rubric: &Rubric,
    temperature: f32,
) -> GenerateRequest {
    let mut parts = Vec::new();

    let metadata = json!({
        "title": bundle.metadata.title,
        "law_number": bundle.metadata.law_number,
        "source_url": bundle.metadata.source_url,
        "documents": bundle.metadata.documents.iter().map(|d| json!({
            "category": d.category.label(),
            "description": d.description,
            "url": d.url,
        })).collect::<Vec<_>>(),
    });
    parts.push(Part::text(format!("ΣΤΟΙΧΕΙΑ ΝΟΜΟΥ:\n{metadata:#}")));

    let consultation = match &bundle.consultation_url {
        Some(url) => format!(
            "ΔΙΑΒΟΥΛΕΥΣΗ:\nURL: {url}\nΗμερομηνίες: {dates}\n{text}",
            dates = if bundle.consultation_dates.is_empty() {
                "-".to_string()
            } else {
                bundle.consultation_dates.join(", ")
            },
            text = bundle.consultation_text,
        ),
        None => "ΔΙΑΒΟΥΛΕΥΣΗ: δεν βρέθηκαν στοιχεία διαβούλευσης.".to_string(),
    };
    parts.push(Part::text(consultation));

    for category in DocumentCategory::ALL {
        let section = bundle.section(category);
        if !section.is_empty() {
            parts.push(Part::text(format!(
                "{}:\n{section}",
                category.label().to_uppercase()
            )));
        }
    }

    for attachment in &bundle.attachments {
        parts.push(Part::text(format!(
            "Συνημμένο έγγραφο ({}): {}",
            attachment.category.label(),
            attachment.description
        )));
        parts.push(Part::File {
            uri: attachment.file_uri.clone(),
            mime_type: attachment.mime_type.clone(),
        });
    }

    parts.push(Part::text(criteria_prompt(rubric)));

    let mut request = GenerateRequest::new(parts)
        .with_system_prompt(rubric.instructions.clone())
        .json();
    request.temperature = temperature;
    request
}

fn criteria_prompt(rubric: &Rubric) -> String {
    let mut out = String::from("ΚΡΙΤΗΡΙΑ (1=ΝΑΙ, 0.5=ΜΕΡΙΚΩΣ, 0=ΟΧΙ):\n");
    for c in &rubric.criteria {
        out.push_str(&format!("{}. {}: {}\n", c.id, c.title, c.question));
    }

    let template = json!({
        "criteria": rubric.criteria.iter().map(|c| json!({
            "id": c.id.to_string(),
            "title": c.title,
            "score_value": 1.0,
            "reason": "...",
        })).collect::<Vec<_>>(),
        "summary": "...",
    });
    out.push_str("\nOUTPUT JSON ONLY:\n");
    out.push_str(&format!("{template:#}"));
    out
}

/// Remove a surrounding Markdown code fence, with or without a language tag.
pub fn strip_code_fences(raw: &str) -> &str {
    let s = raw.trim();
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

#[derive(Deserialize)]
struct RawVerdict {
    criteria: Vec<RawCriterion>,
    #[serde(default)]
    summary: String,
}

#[derive(Deserialize)]
struct RawCriterion {
    id: Value,
    #[serde(default)]
    title: String,
    #[serde(alias = "score_val")]
    score_value: Value,
    #[serde(default)]
    reason: String,
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse and validate a model response against the rubric.
///
/// The criterion id set must equal the rubric's exactly; scores must be one
/// of 0, 0.5, 1. Criteria come back in rubric order.
pub fn parse_verdict(raw: &str, rubric: &Rubric, model: &str) -> Result<Verdict, String> {
    let parsed: RawVerdict = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| format!("response is not a verdict object: {e}"))?;

    if parsed.criteria.len() != rubric.criteria.len() {
        return Err(format!(
            "expected {} criteria, got {}",
            rubric.criteria.len(),
            parsed.criteria.len()
        ));
    }

    let mut by_id: HashMap<u32, CriterionScore> = HashMap::new();
    for c in parsed.criteria {
        let id = number(&c.id)
            .filter(|n| n.fract() == 0.0 && *n >= 0.0)
            .map(|n| n as u32)
            .ok_or_else(|| format!("invalid criterion id {}", c.id))?;
        let score_value = number(&c.score_value)
            .filter(|v| is_valid_score(*v))
            .ok_or_else(|| format!("criterion {id}: invalid score {}", c.score_value))?;
        if rubric.weight(id).is_none() {
            return Err(format!("unknown criterion id {id}"));
        }
        let score = CriterionScore {
            id,
            title: c.title,
            score_value,
            reason: c.reason,
        };
        if by_id.insert(id, score).is_some() {
            return Err(format!("duplicate criterion id {id}"));
        }
    }

    let mut criteria = Vec::with_capacity(rubric.criteria.len());
    for c in &rubric.criteria {
        let mut score = by_id
            .remove(&c.id)
            .ok_or_else(|| format!("missing criterion id {}", c.id))?;
        if score.title.trim().is_empty() {
            score.title = c.title.clone();
        }
        criteria.push(score);
    }

    Ok(Verdict::scored(criteria, parsed.summary, model, rubric))
}
