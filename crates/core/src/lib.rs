//! # Bioethics Core
//!
//! Core logic for structured bioethics case deliberation.
//!
//! This crate contains the case model and everything derived from it:
//! - Bias scoring over stakeholder principle weightings
//! - Chart specifications, report assembly and informed consent text
//! - PDF and Markdown export of reports and consent forms
//! - Per-user case persistence with sharded JSON storage under `BIOETHICS_DATA_DIR`
//! - The [`CaseSession`] that runs submissions, AI narratives and chat turns
//!
//! **No API concerns**: HTTP servers, CLIs and AI provider clients belong in
//! `api-rest`, `cli` and `ai`.

pub mod ai;
pub mod assessment;
pub mod case;
pub mod charts;
pub mod chat;
pub mod config;
pub mod consent;
pub mod constants;
pub mod error;
pub mod export;
pub mod knowledge_base;
pub mod pdf;
pub mod perspectives;
pub mod prompts;
pub mod report;
pub mod repositories;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use ai::Completer;
pub use assessment::{assess, EthicalAssessment, Severity};
pub use case::{Case, CaseForm, Condition, DilemmaCategory, Gender, PatientDetails};
pub use charts::{build_charts, ChartSet};
pub use chat::{ChatLog, ChatMessage, ChatRole};
pub use config::CoreConfig;
pub use consent::build_consent_text;
pub use error::{AiError, CaseError, CaseResult};
pub use knowledge_base::KnowledgeBase;
pub use perspectives::{Perspectives, PerspectivesForm, Principle, PrincipleScores, ScoresForm, Stakeholder};
pub use report::{assemble, Report, ReportPatch};
pub use repositories::{CaseStore, FileCaseStore, InMemoryCaseStore};
pub use session::{CaseSession, Notice, NoticeLevel, SessionServices};

pub use bioethics_types::{CaseId, NonEmptyText, TextError, UserId};
