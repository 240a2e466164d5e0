//! Persistence gateway for case reports.
//!
//! Reports are documents keyed by `(user id, case id)`. Submissions overwrite
//! the whole document; later AI and chat actions patch single fields. There is
//! no optimistic concurrency: the last writer wins.

pub mod cases;
pub mod memory;

use crate::chat::ChatMessage;
use crate::error::CaseResult;
use crate::report::{Report, ReportPatch};
use bioethics_types::{CaseId, UserId};
use std::collections::BTreeMap;

pub use cases::FileCaseStore;
pub use memory::InMemoryCaseStore;

pub trait CaseStore: Send + Sync {
    /// Writes the full report, replacing any stored document for the case.
    fn put_case(&self, user: &UserId, case_id: &CaseId, report: &Report) -> CaseResult<()>;

    /// Applies a field patch to an existing report.
    ///
    /// Returns `CaseError::CaseNotFound` if the case was never stored.
    fn update_case_field(&self, user: &UserId, case_id: &CaseId, patch: ReportPatch) -> CaseResult<()>;

    /// Appends messages to the stored chat transcript in one write.
    fn append_chat(&self, user: &UserId, case_id: &CaseId, messages: &[ChatMessage]) -> CaseResult<()>;

    fn get_case(&self, user: &UserId, case_id: &CaseId) -> CaseResult<Option<Report>>;

    /// All of a user's reports keyed by case id.
    fn list_cases(&self, user: &UserId) -> CaseResult<BTreeMap<CaseId, Report>>;
}
