//! Terminal cards for located laws and audit verdicts.

use lexaudit_core::{ExtractionMode, LawRecord, Rubric};
use lexaudit_pipeline::AuditReport;

const MAX_REASON_CHARS: usize = 400;

/// Print a located law and its documents grouped by category.
pub fn print_law_card(record: &LawRecord) {
    print!("{}", render_law_card(record));
}

/// Print the verdict: score out of 100, summary, per-criterion breakdown.
pub fn print_verdict_card(report: &AuditReport, rubric: &Rubric) {
    print!("{}", render_verdict_card(report, rubric));
}

pub fn render_law_card(record: &LawRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} ===\n", record.title));
    if let Some(n) = &record.law_number {
        out.push_str(&format!("  {:<14} {}\n", "law number", n));
    }
    if let Some(url) = &record.source_url {
        out.push_str(&format!("  {:<14} {}\n", "page", url));
    }
    out.push('\n');

    if record.documents.is_empty() {
        out.push_str("  (no documents)\n");
        return out;
    }

    for (category, count) in record.category_counts() {
        out.push_str(&format!("{} ({count})\n", category.label()));
        for doc in record.documents.iter().filter(|d| d.category == category) {
            if doc.description.is_empty() {
                out.push_str(&format!("  {}\n", doc.url));
            } else {
                out.push_str(&format!("  {:<40} {}\n", doc.description, doc.url));
            }
        }
        out.push('\n');
    }
    out
}

pub fn render_verdict_card(report: &AuditReport, rubric: &Rubric) -> String {
    let verdict = &report.verdict;
    let mut out = String::new();

    out.push_str(&format!("=== {} ===\n", report.record.title));
    out.push_str(&format!(
        "  {:<14} {}/100\n",
        "score",
        format_points(verdict.total_score)
    ));
    out.push_str(&format!("  {:<14} {}\n", "model", verdict.model));
    out.push_str(&format!(
        "  {:<14} {} text, {} OCR, {} attached, {} failed\n",
        "documents",
        report.count(ExtractionMode::Text),
        report.count(ExtractionMode::Ocr),
        report.documents.iter().filter(|d| d.attached).count(),
        report
            .documents
            .iter()
            .filter(|d| d.mode == ExtractionMode::Failed && !d.attached)
            .count(),
    ));
    match &report.consultation_url {
        Some(url) => out.push_str(&format!("  {:<14} {}\n", "consultation", url)),
        None => out.push_str(&format!("  {:<14} not found\n", "consultation")),
    }
    out.push('\n');

    if !verdict.summary.is_empty() {
        out.push_str(&verdict.summary);
        out.push_str("\n\n");
    }

    for c in &verdict.criteria {
        let weight = rubric.weight(c.id).unwrap_or(0.0);
        out.push_str(&format!(
            "{} {:>2}. {:<24} {:>5}/{}\n",
            mark(c.score_value),
            c.id,
            c.title,
            format_points(c.points(rubric)),
            format_points(weight),
        ));
        if !c.reason.is_empty() {
            let reason: String = c.reason.chars().take(MAX_REASON_CHARS).collect();
            out.push_str(&format!("      {reason}\n"));
        }
    }
    out
}

fn mark(score: f64) -> &'static str {
    if score >= 1.0 {
        "[+]"
    } else if score > 0.0 {
        "[~]"
    } else {
        "[-]"
    }
}

/// Whole numbers without decimals, halves with one.
fn format_points(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{points:.0}")
    } else {
        format!("{points:.1}")
    }
}
