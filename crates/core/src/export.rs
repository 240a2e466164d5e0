//! Document export for reports and consent forms.
//!
//! Reports and consent forms are exported as PDF (see [`crate::pdf`]). Reports
//! can also be rendered as Markdown, in which case free-text fields written by
//! users or returned by the AI are escaped so they cannot open headings,
//! horizontal rules or code fences inside the document.

use crate::error::{CaseError, CaseResult};
use crate::pdf;
use crate::perspectives::{Principle, PrincipleScores};
use crate::report::Report;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub(crate) const REPORT_TITLE: &str = "Deliberative Report";
pub(crate) const VISUALISATIONS_TITLE: &str = "Data Visualisations";
pub(crate) const CHAT_TITLE: &str = "Deliberation Chat History";
pub(crate) const VISUALISATIONS_NOTE: &str =
    "The radar and consensus/dissent charts are interactive-only and are shown in the application.";

/// Escapes Markdown structure in prose.
///
/// Line-start `#`, thematic breaks (three or more `-`, `*` or `_`, spaces
/// allowed), setext underlines and code fences (backticks or tildes) are
/// prefixed with backslashes.
pub fn escape_prose(text: &str) -> String {
    text.lines()
        .map(|line| {
            let trimmed = line.trim();
            if line.trim_start().starts_with('#') {
                line.replacen('#', r"\#", 1)
            } else if is_break_or_underline(trimmed) {
                format!(r"\{trimmed}")
            } else {
                line.replace("```", r"\`\`\`").replace("~~~", r"\~\~\~")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_break_or_underline(trimmed: &str) -> bool {
    let compact: Vec<char> = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    let Some(&first) = compact.first() else {
        return false;
    };
    if !compact.iter().all(|&c| c == first) {
        return false;
    }
    match first {
        // Any run of `=` or `-` underlines the previous line as a heading.
        '=' | '-' => true,
        '*' | '_' => compact.len() >= 3,
        _ => false,
    }
}

fn section(out: &mut String, heading: &str, body: &str) {
    if body.trim().is_empty() {
        return;
    }
    let _ = write!(out, "## {heading}\n\n{}\n\n", escape_prose(body.trim()));
}

/// Headed text fields of a report in document order, empty ones included.
pub(crate) fn text_fields(report: &Report) -> [(&'static str, String); 10] {
    [
        ("Case ID", report.case_id.to_string()),
        (
            "Analysis Date",
            report.analysed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
        ("Analyst", report.analyst.clone()),
        ("Patient Summary", report.patient_summary.clone()),
        ("Main Ethical Dilemma (Selected)", report.dilemma.label().to_string()),
        ("AI-Suggested Dilemma", report.ai_suggested_dilemma.clone()),
        ("Detailed Case Description", report.case_description.clone()),
        ("Sociocultural and Family Context", report.sociocultural_context.clone()),
        ("Key Points for AI Deliberation", report.ai_key_points.clone()),
        ("AI Clinical History Analysis", report.ai_clinical_history_analysis.clone()),
    ]
}

/// `Autonomy: 5, Beneficence: 4, ...` for one stakeholder.
pub(crate) fn scores_line(scores: &PrincipleScores) -> String {
    Principle::ALL
        .iter()
        .map(|p| format!("{}: {}", p.label(), scores.get(*p)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders a report as a Markdown document.
///
/// Textual fields come first in a fixed order and are skipped when empty.
pub fn render_report_markdown(report: &Report) -> String {
    let mut out = format!("# {REPORT_TITLE}\n\n");

    for (heading, body) in text_fields(report) {
        section(&mut out, heading, &body);
    }

    let assessment = &report.assessment;
    let _ = write!(
        out,
        "## Ethical Coherence Analysis\n\n**Severity level:** {}\n\n",
        assessment.severity
    );
    for warning in &assessment.warnings {
        let _ = writeln!(out, "- {warning}");
    }
    if !assessment.warnings.is_empty() {
        out.push('\n');
    }
    if !assessment.recommendations.is_empty() {
        out.push_str("**Recommendations:**\n\n");
        for recommendation in &assessment.recommendations {
            let _ = writeln!(out, "- {recommendation}");
        }
        out.push('\n');
    }

    out.push_str("## Multi-perspective Analysis\n\n");
    for (stakeholder, scores) in report.perspectives.iter() {
        let _ = writeln!(out, "- **{}:** {}", stakeholder.label(), scores_line(scores));
    }
    out.push('\n');

    section(&mut out, "Deliberative Analysis (AI)", &report.deliberative_analysis);

    let _ = write!(out, "---\n\n# {VISUALISATIONS_TITLE}\n\n{VISUALISATIONS_NOTE}\n");

    if !report.chat_history.is_empty() {
        let _ = write!(out, "\n---\n\n# {CHAT_TITLE}\n\n");
        for message in &report.chat_history {
            let _ = write!(
                out,
                "**{}:** {}\n\n",
                message.role,
                escape_prose(message.content.trim())
            );
        }
    }

    out
}

/// Replaces every character outside `[A-Za-z0-9_-]` so a case id can name a file.
pub fn safe_file_stem(case_id: &str) -> String {
    let stem: String = case_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "report".into() } else { stem }
}

fn write_document(dir: &Path, file_name: String, contents: &[u8]) -> CaseResult<PathBuf> {
    fs::create_dir_all(dir).map_err(CaseError::StorageDirCreation)?;
    let path = dir.join(file_name);
    fs::write(&path, contents).map_err(CaseError::FileWrite)?;
    tracing::info!("exported {}", path.display());
    Ok(path)
}

/// Writes `Report_<case id>.pdf` into `dir`.
pub fn export_report(report: &Report, dir: &Path) -> CaseResult<PathBuf> {
    let name = format!("Report_{}.pdf", safe_file_stem(report.case_id.as_str()));
    write_document(dir, name, &pdf::render_report_pdf(report)?)
}

/// Writes `Report_<case id>.md` into `dir`.
pub fn export_report_markdown(report: &Report, dir: &Path) -> CaseResult<PathBuf> {
    let name = format!("Report_{}.md", safe_file_stem(report.case_id.as_str()));
    write_document(dir, name, render_report_markdown(report).as_bytes())
}

/// Writes `Consent_<case id>.pdf` into `dir`.
pub fn export_consent(case_id: &str, consent_text: &str, dir: &Path) -> CaseResult<PathBuf> {
    let name = format!("Consent_{}.pdf", safe_file_stem(case_id));
    write_document(dir, name, &pdf::render_consent_pdf(consent_text)?)
}
