//! Report assembly.
//!
//! A [`Report`] is the persisted unit: the case, its assessment and charts,
//! and the AI text added later. Assembly is a deterministic field mapping; it
//! never calls the AI service; the deliberative analysis starts empty and is
//! filled by a separate action.

use crate::assessment::EthicalAssessment;
use crate::case::{Case, DilemmaCategory, PatientDetails};
use crate::charts::ChartSet;
use crate::chat::ChatLog;
use crate::perspectives::Perspectives;
use bioethics_types::CaseId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub case_id: CaseId,
    pub analysed_at: DateTime<Utc>,
    pub analyst: String,
    pub patient: PatientDetails,
    pub patient_summary: String,
    pub dilemma: DilemmaCategory,
    #[serde(default)]
    pub ai_suggested_dilemma: String,
    #[serde(default)]
    pub case_description: String,
    #[serde(default)]
    pub sociocultural_context: String,
    #[serde(default)]
    pub ai_key_points: String,
    #[serde(default)]
    pub ai_clinical_history_analysis: String,
    pub perspectives: Perspectives,
    pub assessment: EthicalAssessment,
    #[serde(default)]
    pub deliberative_analysis: String,
    #[serde(default)]
    pub chat_history: ChatLog,
    #[serde(default)]
    pub charts: ChartSet,
}

/// Field-level update applied to a stored report.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportPatch {
    DeliberativeAnalysis(String),
    SuggestedDilemma(String),
}

impl ReportPatch {
    pub fn field_name(&self) -> &'static str {
        match self {
            ReportPatch::DeliberativeAnalysis(_) => "deliberative_analysis",
            ReportPatch::SuggestedDilemma(_) => "ai_suggested_dilemma",
        }
    }
}

impl Report {
    pub fn apply(&mut self, patch: ReportPatch) {
        match patch {
            ReportPatch::DeliberativeAnalysis(text) => self.deliberative_analysis = text,
            ReportPatch::SuggestedDilemma(text) => self.ai_suggested_dilemma = text,
        }
    }

    /// Reconstructs the case the report was assembled from.
    pub fn case(&self) -> Case {
        Case {
            case_id: self.case_id.clone(),
            patient: self.patient.clone(),
            analyst: self.analyst.clone(),
            dilemma: self.dilemma,
            case_description: self.case_description.clone(),
            sociocultural_context: self.sociocultural_context.clone(),
            ai_key_points: self.ai_key_points.clone(),
            ai_clinical_history_analysis: self.ai_clinical_history_analysis.clone(),
            perspectives: self.perspectives,
        }
    }
}

/// One-line patient summary, with a neonatal clause when gestation weeks are set.
pub fn patient_summary(patient: &PatientDetails) -> String {
    let mut summary = format!(
        "Patient {}, {} years, gender {}, condition {}.",
        patient.name, patient.age_years, patient.gender, patient.condition
    );
    if patient.gestation_weeks > 0 {
        summary.push_str(&format!(
            " Neonate at {} weeks of gestation.",
            patient.gestation_weeks
        ));
    }
    summary
}

/// Assembles a report stamped with the current time.
pub fn assemble(
    case: &Case,
    ai_suggested_dilemma: Option<&str>,
    chat_history: ChatLog,
    charts: ChartSet,
    assessment: EthicalAssessment,
) -> Report {
    assemble_at(
        case,
        ai_suggested_dilemma,
        chat_history,
        charts,
        assessment,
        Utc::now(),
    )
}

/// Assembles a report with an explicit timestamp.
///
/// Same inputs always produce the same report.
pub fn assemble_at(
    case: &Case,
    ai_suggested_dilemma: Option<&str>,
    chat_history: ChatLog,
    charts: ChartSet,
    assessment: EthicalAssessment,
    analysed_at: DateTime<Utc>,
) -> Report {
    Report {
        case_id: case.case_id.clone(),
        analysed_at,
        analyst: case.analyst.clone(),
        patient: case.patient.clone(),
        patient_summary: patient_summary(&case.patient),
        dilemma: case.dilemma,
        ai_suggested_dilemma: ai_suggested_dilemma.unwrap_or_default().to_string(),
        case_description: case.case_description.clone(),
        sociocultural_context: case.sociocultural_context.clone(),
        ai_key_points: case.ai_key_points.clone(),
        ai_clinical_history_analysis: case.ai_clinical_history_analysis.clone(),
        perspectives: case.perspectives,
        assessment,
        deliberative_analysis: String::new(),
        chat_history,
        charts,
    }
}
