//! In-memory case store. Nothing survives the process; used by tests and embedders.

use super::CaseStore;
use crate::chat::ChatMessage;
use crate::error::{CaseError, CaseResult};
use crate::report::{Report, ReportPatch};
use bioethics_types::{CaseId, UserId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

type Documents = HashMap<UserId, BTreeMap<CaseId, Report>>;

#[derive(Debug, Default)]
pub struct InMemoryCaseStore {
    documents: Mutex<Documents>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CaseResult<MutexGuard<'_, Documents>> {
        self.documents
            .lock()
            .map_err(|_| CaseError::StoreUnavailable("case store lock poisoned".into()))
    }

    fn modify(&self, user: &UserId, case_id: &CaseId, change: impl FnOnce(&mut Report)) -> CaseResult<()> {
        let mut documents = self.lock()?;
        let report = documents
            .get_mut(user)
            .and_then(|cases| cases.get_mut(case_id))
            .ok_or_else(|| CaseError::CaseNotFound(case_id.to_string()))?;
        change(report);
        Ok(())
    }
}

impl CaseStore for InMemoryCaseStore {
    fn put_case(&self, user: &UserId, case_id: &CaseId, report: &Report) -> CaseResult<()> {
        if &report.case_id != case_id {
            return Err(CaseError::InvalidInput(format!(
                "report belongs to case {}, not {}",
                report.case_id, case_id
            )));
        }
        self.lock()?
            .entry(user.clone())
            .or_default()
            .insert(case_id.clone(), report.clone());
        Ok(())
    }

    fn update_case_field(&self, user: &UserId, case_id: &CaseId, patch: ReportPatch) -> CaseResult<()> {
        self.modify(user, case_id, |report| report.apply(patch))
    }

    fn append_chat(&self, user: &UserId, case_id: &CaseId, messages: &[ChatMessage]) -> CaseResult<()> {
        self.modify(user, case_id, |report| {
            report.chat_history.extend(messages.iter().cloned())
        })
    }

    fn get_case(&self, user: &UserId, case_id: &CaseId) -> CaseResult<Option<Report>> {
        Ok(self
            .lock()?
            .get(user)
            .and_then(|cases| cases.get(case_id))
            .cloned())
    }

    fn list_cases(&self, user: &UserId) -> CaseResult<BTreeMap<CaseId, Report>> {
        Ok(self.lock()?.get(user).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_report;

    #[test]
    fn behaves_like_a_document_store() {
        let store = InMemoryCaseStore::new();
        let user = UserId::new("analyst").unwrap();
        let report = sample_report("HC-1");

        assert_eq!(store.get_case(&user, &report.case_id).unwrap(), None);
        store.put_case(&user, &report.case_id, &report).unwrap();
        store
            .update_case_field(&user, &report.case_id, ReportPatch::SuggestedDilemma("Futility".into()))
            .unwrap();
        store
            .append_chat(&user, &report.case_id, &[ChatMessage::user("Why?")])
            .unwrap();

        let loaded = store.get_case(&user, &report.case_id).unwrap().unwrap();
        assert_eq!(loaded.ai_suggested_dilemma, "Futility");
        assert_eq!(loaded.chat_history.len(), 1);
        assert_eq!(store.list_cases(&user).unwrap().len(), 1);
    }

    #[test]
    fn unknown_case_cannot_be_patched() {
        let store = InMemoryCaseStore::new();
        let user = UserId::new("analyst").unwrap();
        let err = store
            .append_chat(&user, &CaseId::new("nope").unwrap(), &[])
            .unwrap_err();
        assert!(matches!(err, CaseError::CaseNotFound(_)));
    }
}
