//! Prompts sent to the language model.

use crate::error::{CaseError, CaseResult};
use crate::report::Report;

/// Suggested questions offered to the clinician in the deliberation chat.
pub const GUIDED_QUESTIONS: [&str; 8] = [
    "What is the main conflict between bioethical principles in this case?",
    "From a legal standpoint, which regulations or rulings are relevant here?",
    "Which mediation strategies could be used between the medical team and the family?",
    "Which alternative courses of action have not been considered yet?",
    "How do cultural or religious factors influence decision-making?",
    "If we prioritise the principle of beneficence, what would be the recommended course of action?",
    "Analyse the case using Diego Gracia's deliberative methodology.",
    "Which methodology would be most suitable for analysing the case, and what are its purpose and steps?",
];

fn report_context(report: &Report) -> CaseResult<String> {
    serde_json::to_string_pretty(report).map_err(CaseError::Serialization)
}

pub fn clinical_history_prompt(clinical_history: &str) -> String {
    format!(
        "Analyse the following clinical history and extract the key bioethical elements: {}",
        clinical_history.trim()
    )
}

pub fn deliberative_analysis_prompt(report: &Report) -> CaseResult<String> {
    Ok(format!(
        "As a bioethics committee, analyse: {}",
        report_context(report)?
    ))
}

pub fn chat_prompt(report: &Report, question: &str) -> CaseResult<String> {
    Ok(format!(
        "You are an expert in bioethics. Case: {}. Question: '{}'. Answer concisely.",
        report_context(report)?,
        question.trim()
    ))
}
