//! File-backed case store.
//!
//! Each report is one pretty-printed JSON document. Identifiers are free text,
//! so paths are derived from their SHA-256 digests and the document itself
//! carries the case id:
//!
//! ```text
//! <case_data_dir>/users/<s1>/<s2>/<sha256(user_id)>/cases/<sha256(case_id)>.json
//! ```
//!
//! where `s1`/`s2` are the first four hex characters of the user digest.
//! Writes go to a temporary sibling file which is then renamed over the
//! target, so readers never observe a half-written report. Writers share one
//! lock per store, so field patches and chat appends from concurrent requests
//! are applied one after the other. Other processes writing the same
//! directory are not coordinated.

use super::CaseStore;
use crate::chat::ChatMessage;
use crate::config::CoreConfig;
use crate::constants::CASES_DIR_NAME;
use crate::error::{CaseError, CaseResult};
use crate::report::{Report, ReportPatch};
use bioethics_types::{CaseId, UserId};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const CASE_FILE_EXTENSION: &str = "json";

fn digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

#[derive(Clone, Debug)]
pub struct FileCaseStore {
    cfg: Arc<CoreConfig>,
    writes: Arc<Mutex<()>>,
}

impl FileCaseStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            cfg,
            writes: Arc::new(Mutex::new(())),
        }
    }

    fn write_lock(&self) -> CaseResult<MutexGuard<'_, ()>> {
        self.writes
            .lock()
            .map_err(|_| CaseError::StoreUnavailable("case store lock poisoned".into()))
    }

    fn user_dir(&self, user: &UserId) -> PathBuf {
        let hashed = digest(user.as_str());
        self.cfg
            .users_dir()
            .join(&hashed[0..2])
            .join(&hashed[2..4])
            .join(&hashed)
    }

    fn cases_dir(&self, user: &UserId) -> PathBuf {
        self.user_dir(user).join(CASES_DIR_NAME)
    }

    fn case_path(&self, user: &UserId, case_id: &CaseId) -> PathBuf {
        self.cases_dir(user)
            .join(format!("{}.{CASE_FILE_EXTENSION}", digest(case_id.as_str())))
    }

    fn read_report(path: &Path) -> CaseResult<Option<Report>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CaseError::FileRead(e)),
        };
        let report = serde_json::from_str(&contents).map_err(CaseError::Deserialization)?;
        Ok(Some(report))
    }

    fn write_report(path: &Path, report: &Report) -> CaseResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(CaseError::StorageDirCreation)?;
        }

        let json = serde_json::to_string_pretty(report).map_err(CaseError::Serialization)?;
        let tmp = path.with_extension(format!("{CASE_FILE_EXTENSION}.tmp"));
        fs::write(&tmp, json).map_err(CaseError::FileWrite)?;
        fs::rename(&tmp, path).map_err(CaseError::FileWrite)
    }

    fn modify(
        &self,
        user: &UserId,
        case_id: &CaseId,
        change: impl FnOnce(&mut Report),
    ) -> CaseResult<()> {
        let _guard = self.write_lock()?;
        let path = self.case_path(user, case_id);
        let mut report = Self::read_report(&path)?
            .ok_or_else(|| CaseError::CaseNotFound(case_id.to_string()))?;
        change(&mut report);
        Self::write_report(&path, &report)
    }
}

impl CaseStore for FileCaseStore {
    fn put_case(&self, user: &UserId, case_id: &CaseId, report: &Report) -> CaseResult<()> {
        if &report.case_id != case_id {
            return Err(CaseError::InvalidInput(format!(
                "report belongs to case {}, not {}",
                report.case_id, case_id
            )));
        }
        let _guard = self.write_lock()?;
        Self::write_report(&self.case_path(user, case_id), report)?;
        tracing::debug!("stored case {} for user {}", case_id, user);
        Ok(())
    }

    fn update_case_field(&self, user: &UserId, case_id: &CaseId, patch: ReportPatch) -> CaseResult<()> {
        let field = patch.field_name();
        self.modify(user, case_id, |report| report.apply(patch))?;
        tracing::debug!("updated {} on case {}", field, case_id);
        Ok(())
    }

    fn append_chat(&self, user: &UserId, case_id: &CaseId, messages: &[ChatMessage]) -> CaseResult<()> {
        self.modify(user, case_id, |report| {
            report.chat_history.extend(messages.iter().cloned())
        })
    }

    fn get_case(&self, user: &UserId, case_id: &CaseId) -> CaseResult<Option<Report>> {
        Self::read_report(&self.case_path(user, case_id))
    }

    /// Reads every case document under the user's directory.
    ///
    /// Files that cannot be parsed are logged as warnings and skipped.
    fn list_cases(&self, user: &UserId) -> CaseResult<BTreeMap<CaseId, Report>> {
        let mut cases = BTreeMap::new();

        let entries = match fs::read_dir(self.cases_dir(user)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(cases),
            Err(e) => return Err(CaseError::FileRead(e)),
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(CASE_FILE_EXTENSION) {
                continue;
            }

            match Self::read_report(&path) {
                Ok(Some(report)) => {
                    cases.insert(report.case_id.clone(), report);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("skipping unreadable case file {}: {}", path.display(), e),
            }
        }

        Ok(cases)
    }
}
