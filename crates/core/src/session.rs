//! Per-user deliberation session.
//!
//! A [`CaseSession`] carries everything one analyst works with: the active
//! report, its consent text, the AI-suggested dilemma and the preliminary
//! clinical-history analysis. Shared services (store, knowledge base, AI
//! completer) are injected through [`SessionServices`].
//!
//! Validation failures are returned as errors and leave the session and the
//! store untouched. Failures of external services (AI, storage) are logged,
//! recorded as [`Notice`]s and the operation carries on without them.

use crate::ai::Completer;
use crate::assessment::assess;
use crate::case::{Case, CaseForm};
use crate::charts::build_charts;
use crate::chat::{ChatLog, ChatMessage};
use crate::constants::AI_UNAVAILABLE_TEXT;
use crate::consent::build_consent_text;
use crate::error::{AiError, CaseError, CaseResult};
use crate::knowledge_base::KnowledgeBase;
use crate::prompts;
use crate::report::{assemble, Report, ReportPatch};
use crate::repositories::CaseStore;
use bioethics_types::{CaseId, UserId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct SessionServices {
    pub store: Arc<dyn CaseStore>,
    pub knowledge_base: Arc<KnowledgeBase>,
    pub completer: Option<Arc<dyn Completer>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-visible message about a degraded or completed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

pub struct CaseSession {
    services: SessionServices,
    user_id: UserId,
    analyst: String,
    report: Option<Report>,
    consent_text: Option<String>,
    suggested_dilemma: Option<String>,
    clinical_analysis: Option<String>,
    notices: Vec<Notice>,
}

impl CaseSession {
    /// Starts an empty session. `analyst` fills the analyst name of
    /// submitted forms that leave it blank.
    pub fn new(services: SessionServices, user_id: UserId, analyst: impl Into<String>) -> Self {
        Self {
            services,
            user_id,
            analyst: analyst.into(),
            report: None,
            consent_text: None,
            suggested_dilemma: None,
            clinical_analysis: None,
            notices: Vec::new(),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn analyst(&self) -> &str {
        &self.analyst
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn consent_text(&self) -> Option<&str> {
        self.consent_text.as_deref()
    }

    pub fn suggested_dilemma(&self) -> Option<&str> {
        self.suggested_dilemma.as_deref()
    }

    pub fn clinical_analysis(&self) -> Option<&str> {
        self.clinical_analysis.as_deref()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Drains the accumulated notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn active_report(&self) -> CaseResult<&Report> {
        self.report.as_ref().ok_or(CaseError::NoActiveCase)
    }

    fn degrade(&mut self, context: &str, err: impl fmt::Display) {
        tracing::error!("{}: {}", context, err);
        self.notices
            .push(Notice::new(NoticeLevel::Error, format!("{context}: {err}")));
    }

    /// Returns the completer, or records a notice when AI is disabled.
    fn completer(&mut self) -> Option<Arc<dyn Completer>> {
        let completer = self.services.completer.clone();
        if completer.is_none() {
            tracing::warn!("AI request skipped: {}", AiError::NotConfigured);
            self.notices.push(Notice::new(
                NoticeLevel::Warning,
                AiError::NotConfigured.to_string(),
            ));
        }
        completer
    }

    async fn complete(&mut self, context: &str, prompt: &str) -> Option<String> {
        let completer = self.completer()?;
        match completer.complete(prompt).await {
            Ok(text) => Some(text),
            Err(e) => {
                self.degrade(context, e);
                None
            }
        }
    }

    /// Asks the AI for the bioethical elements of a pasted clinical history.
    ///
    /// The result is kept for the next submission. Returns `None` when the AI
    /// is disabled or failed; a notice says which.
    pub async fn analyse_clinical_history(&mut self, clinical_history: &str) -> CaseResult<Option<&str>> {
        if clinical_history.trim().is_empty() {
            return Err(CaseError::InvalidInput(
                "clinical history cannot be empty".into(),
            ));
        }

        let prompt = prompts::clinical_history_prompt(clinical_history);
        let Some(analysis) = self.complete("clinical history analysis failed", &prompt).await else {
            return Ok(None);
        };
        Ok(Some(self.clinical_analysis.insert(analysis).as_str()))
    }

    /// Validates a form and makes the resulting report the active case.
    ///
    /// The case id is mandatory here. A blank analyst name is replaced by the
    /// session's analyst and a blank clinical-history summary by the last
    /// preliminary analysis. The report is persisted; a storage failure is
    /// recorded as a notice and the report stays active in the session.
    pub fn submit(&mut self, form: &CaseForm, generate_consent: bool) -> CaseResult<&Report> {
        if form.supplied_case_id().is_none() {
            return Err(CaseError::MissingCaseId);
        }

        let mut form = form.clone();
        if is_blank(form.analyst_name.as_deref()) {
            form.analyst_name = Some(self.analyst.clone());
        }
        if is_blank(form.ai_clinical_history_analysis.as_deref()) {
            form.ai_clinical_history_analysis = self.clinical_analysis.clone();
        }

        let case = Case::from_form(&form)?;
        let charts = build_charts(&case.perspectives);
        let assessment = assess(&case.perspectives);
        tracing::info!(
            "assessed case {}: severity {:?}, {} warning(s)",
            case.case_id,
            assessment.severity,
            assessment.warnings.len()
        );

        let report = assemble(
            &case,
            self.suggested_dilemma.as_deref(),
            ChatLog::new(),
            charts,
            assessment,
        );

        match self.services.store.put_case(&self.user_id, &case.case_id, &report) {
            Ok(()) => self.notices.push(Notice::new(
                NoticeLevel::Info,
                format!("Case '{}' saved.", case.case_id),
            )),
            Err(e) => self.degrade(&format!("could not save case {}", case.case_id), e),
        }

        self.consent_text = generate_consent
            .then(|| build_consent_text(&case, &self.services.knowledge_base));

        Ok(&*self.report.insert(report))
    }

    /// Builds the consent text for the active case.
    pub fn generate_consent(&mut self) -> CaseResult<&str> {
        let case = self.active_report()?.case();
        let text = build_consent_text(&case, &self.services.knowledge_base);
        Ok(self.consent_text.insert(text).as_str())
    }

    /// Records the AI-suggested dilemma, on the active report too if there is one.
    pub fn suggest_dilemma(&mut self, suggestion: impl Into<String>) {
        let suggestion = suggestion.into();
        if let Some(report) = self.report.as_mut() {
            let patch = ReportPatch::SuggestedDilemma(suggestion.clone());
            report.apply(patch.clone());
            let case_id = report.case_id.clone();
            if let Err(e) = self.services.store.update_case_field(&self.user_id, &case_id, patch) {
                self.degrade(&format!("could not update case {case_id}"), e);
            }
        }
        self.suggested_dilemma = Some(suggestion);
    }

    /// Asks the AI for a deliberative analysis of the active report.
    ///
    /// On AI failure the stored narrative is left as it was and `None` is
    /// returned alongside a notice.
    pub async fn generate_narrative(&mut self) -> CaseResult<Option<&str>> {
        let prompt = prompts::deliberative_analysis_prompt(self.active_report()?)?;
        let Some(narrative) = self.complete("deliberative analysis failed", &prompt).await else {
            return Ok(None);
        };

        let report = self.report.as_mut().ok_or(CaseError::NoActiveCase)?;
        let patch = ReportPatch::DeliberativeAnalysis(narrative);
        report.apply(patch.clone());
        let case_id = report.case_id.clone();

        if let Err(e) = self.services.store.update_case_field(&self.user_id, &case_id, patch) {
            self.degrade(&format!("could not save analysis for case {case_id}"), e);
        }

        Ok(self.report.as_ref().map(|r| r.deliberative_analysis.as_str()))
    }

    /// One deliberation chat turn.
    ///
    /// The question and the reply are appended together. When the AI call
    /// fails the reply is a fixed unavailability message; when AI is disabled
    /// nothing is appended and `None` is returned.
    pub async fn ask(&mut self, question: &str) -> CaseResult<Option<ChatMessage>> {
        let question = question.trim();
        if question.is_empty() {
            return Err(CaseError::InvalidInput("question cannot be empty".into()));
        }

        let prompt = prompts::chat_prompt(self.active_report()?, question)?;
        if self.completer().is_none() {
            return Ok(None);
        }
        let answer = self
            .complete("chat request failed", &prompt)
            .await
            .unwrap_or_else(|| AI_UNAVAILABLE_TEXT.to_string());

        let turn = [ChatMessage::user(question), ChatMessage::assistant(answer)];
        let report = self.report.as_mut().ok_or(CaseError::NoActiveCase)?;
        report.chat_history.extend(turn.iter().cloned());
        let case_id = report.case_id.clone();

        if let Err(e) = self.services.store.append_chat(&self.user_id, &case_id, &turn) {
            self.degrade(&format!("could not save chat history for case {case_id}"), e);
        }

        let [_, reply] = turn;
        Ok(Some(reply))
    }

    /// Makes a stored case the active one.
    pub fn resume(&mut self, case_id: &CaseId) -> CaseResult<&Report> {
        let report = self
            .services
            .store
            .get_case(&self.user_id, case_id)?
            .ok_or_else(|| CaseError::CaseNotFound(case_id.to_string()))?;

        self.consent_text = None;
        self.suggested_dilemma = Some(report.ai_suggested_dilemma.clone()).filter(|s| !s.is_empty());
        tracing::info!("resumed case {} for user {}", case_id, self.user_id);
        Ok(&*self.report.insert(report))
    }

    pub fn list_cases(&self) -> CaseResult<BTreeMap<CaseId, Report>> {
        self.services.store.list_cases(&self.user_id)
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::Severity;
    use crate::chat::ChatRole;
    use crate::repositories::InMemoryCaseStore;
    use crate::test_support::{sample_form, scores};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers every prompt with a fixed reply and remembers the prompts.
    struct Scripted {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Completer for Scripted {
        async fn complete(&self, prompt: &str) -> Result<String, AiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl Completer for Unreachable {
        async fn complete(&self, _prompt: &str) -> Result<String, AiError> {
            Err(AiError::Timeout)
        }
    }

    struct BrokenStore;

    impl CaseStore for BrokenStore {
        fn put_case(&self, _: &UserId, _: &CaseId, _: &Report) -> CaseResult<()> {
            Err(CaseError::StoreUnavailable("disk full".into()))
        }
        fn update_case_field(&self, _: &UserId, _: &CaseId, _: ReportPatch) -> CaseResult<()> {
            Err(CaseError::StoreUnavailable("disk full".into()))
        }
        fn append_chat(&self, _: &UserId, _: &CaseId, _: &[ChatMessage]) -> CaseResult<()> {
            Err(CaseError::StoreUnavailable("disk full".into()))
        }
        fn get_case(&self, _: &UserId, _: &CaseId) -> CaseResult<Option<Report>> {
            Err(CaseError::StoreUnavailable("disk full".into()))
        }
        fn list_cases(&self, _: &UserId) -> CaseResult<BTreeMap<CaseId, Report>> {
            Err(CaseError::StoreUnavailable("disk full".into()))
        }
    }

    fn services(
        store: Arc<dyn CaseStore>,
        completer: Option<Arc<dyn Completer>>,
    ) -> SessionServices {
        SessionServices {
            store,
            knowledge_base: Arc::new(KnowledgeBase::builtin().unwrap()),
            completer,
        }
    }

    fn session_with(
        store: Arc<dyn CaseStore>,
        completer: Option<Arc<dyn Completer>>,
    ) -> CaseSession {
        CaseSession::new(
            services(store, completer),
            UserId::new("uid-42").unwrap(),
            "dr.ortiz@example.org",
        )
    }

    #[test]
    fn submit_persists_report_and_optional_consent() {
        let store = Arc::new(InMemoryCaseStore::new());
        let mut session = session_with(store.clone(), None);

        let report = session.submit(&sample_form("HC-1"), true).unwrap();
        assert_eq!(report.case_id.as_str(), "HC-1");
        assert_eq!(report.analyst, "Dr. Ortiz");

        let stored = store
            .get_case(session.user_id(), &CaseId::new("HC-1").unwrap())
            .unwrap();
        assert_eq!(stored.as_ref(), session.report());
        assert!(session.consent_text().unwrap().contains("Case ID: HC-1"));
        assert_eq!(session.notices()[0].level, NoticeLevel::Info);
    }

    #[test]
    fn blank_case_id_writes_nothing() {
        let store = Arc::new(InMemoryCaseStore::new());
        let mut session = session_with(store.clone(), None);

        let mut form = sample_form("HC-1");
        form.case_id = Some("   ".into());
        let err = session.submit(&form, true).unwrap_err();

        assert!(matches!(err, CaseError::MissingCaseId));
        assert!(session.report().is_none());
        assert!(session.consent_text().is_none());
        assert!(store.list_cases(session.user_id()).unwrap().is_empty());
    }

    #[test]
    fn out_of_range_scores_abort_submission() {
        let store = Arc::new(InMemoryCaseStore::new());
        let mut session = session_with(store.clone(), None);

        let mut form = sample_form("HC-1");
        form.perspectives.family = scores(6, 0, 0, 0);
        assert!(matches!(
            session.submit(&form, false),
            Err(CaseError::OutOfRange { .. })
        ));
        assert!(store.list_cases(session.user_id()).unwrap().is_empty());
    }

    #[test]
    fn blank_analyst_falls_back_to_session_analyst() {
        let mut session = session_with(Arc::new(InMemoryCaseStore::new()), None);
        let mut form = sample_form("HC-1");
        form.analyst_name = None;
        let report = session.submit(&form, false).unwrap();
        assert_eq!(report.analyst, "dr.ortiz@example.org");
        assert!(session.consent_text().is_none());
    }

    #[test]
    fn storage_failure_is_a_notice_not_an_error() {
        let mut session = session_with(Arc::new(BrokenStore), None);
        let mut form = sample_form("HC-1");
        form.perspectives.family = scores(0, 0, 0, 0);

        let report = session.submit(&form, false).unwrap();
        assert_eq!(report.assessment.severity, Severity::Critical);

        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(notices[0].message.contains("disk full"));
        assert!(session.notices().is_empty());
    }

    #[tokio::test]
    async fn clinical_analysis_feeds_the_next_submission() {
        let completer = Scripted::new("Autonomy conflict.");
        let mut session = session_with(
            Arc::new(InMemoryCaseStore::new()),
            Some(completer.clone()),
        );

        let analysis = session
            .analyse_clinical_history("72-year-old refusing dialysis")
            .await
            .unwrap();
        assert_eq!(analysis, Some("Autonomy conflict."));
        assert!(completer.prompts.lock().unwrap()[0].ends_with("72-year-old refusing dialysis"));

        let report = session.submit(&sample_form("HC-7"), false).unwrap();
        assert_eq!(report.ai_clinical_history_analysis, "Autonomy conflict.");
    }

    #[tokio::test]
    async fn analysis_without_ai_key_is_a_warning() {
        let mut session = session_with(Arc::new(InMemoryCaseStore::new()), None);
        let analysis = session.analyse_clinical_history("history").await.unwrap();
        assert_eq!(analysis, None);
        assert_eq!(session.notices()[0].level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn narrative_is_stored_on_report_and_in_store() {
        let store = Arc::new(InMemoryCaseStore::new());
        let completer = Scripted::new("The committee recommends mediation.");
        let mut session = session_with(store.clone(), Some(completer.clone()));
        session.submit(&sample_form("HC-2"), false).unwrap();

        let narrative = session.generate_narrative().await.unwrap();
        assert_eq!(narrative, Some("The committee recommends mediation."));

        let prompt = completer.prompts.lock().unwrap()[0].clone();
        assert!(prompt.starts_with("As a bioethics committee, analyse: "));
        assert!(prompt.contains("\"case_id\": \"HC-2\""));

        let stored = store
            .get_case(session.user_id(), &CaseId::new("HC-2").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(stored.deliberative_analysis, "The committee recommends mediation.");
    }

    #[tokio::test]
    async fn failed_narrative_leaves_report_empty() {
        let store = Arc::new(InMemoryCaseStore::new());
        let mut session = session_with(store.clone(), Some(Arc::new(Unreachable)));
        session.submit(&sample_form("HC-3"), false).unwrap();
        session.take_notices();

        assert_eq!(session.generate_narrative().await.unwrap(), None);
        assert_eq!(session.report().unwrap().deliberative_analysis, "");
        assert_eq!(session.notices().len(), 1);
        assert!(session.notices()[0].message.contains("timed out"));
    }

    #[tokio::test]
    async fn narrative_requires_active_case() {
        let mut session = session_with(
            Arc::new(InMemoryCaseStore::new()),
            Some(Scripted::new("x")),
        );
        assert!(matches!(
            session.generate_narrative().await,
            Err(CaseError::NoActiveCase)
        ));
    }

    #[tokio::test]
    async fn chat_turns_append_in_order() {
        let store = Arc::new(InMemoryCaseStore::new());
        let mut session = session_with(store.clone(), Some(Scripted::new("Answer.")));
        session.submit(&sample_form("HC-4"), false).unwrap();

        let reply = session.ask(" First? ").await.unwrap().unwrap();
        assert_eq!(reply, ChatMessage::assistant("Answer."));
        session.ask("Second?").await.unwrap();

        let stored = store
            .get_case(session.user_id(), &CaseId::new("HC-4").unwrap())
            .unwrap()
            .unwrap();
        let contents: Vec<_> = stored.chat_history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["First?", "Answer.", "Second?", "Answer."]);
        assert_eq!(&stored.chat_history, &session.report().unwrap().chat_history);
    }

    #[tokio::test]
    async fn failed_chat_turn_records_unavailable_reply() {
        let mut session = session_with(
            Arc::new(InMemoryCaseStore::new()),
            Some(Arc::new(Unreachable)),
        );
        session.submit(&sample_form("HC-5"), false).unwrap();

        let reply = session.ask("Is this futile?").await.unwrap().unwrap();
        assert_eq!(reply.role, ChatRole::Assistant);
        assert_eq!(reply.content, AI_UNAVAILABLE_TEXT);
        assert_eq!(session.report().unwrap().chat_history.len(), 2);
    }

    #[tokio::test]
    async fn chat_without_ai_appends_nothing() {
        let mut session = session_with(Arc::new(InMemoryCaseStore::new()), None);
        session.submit(&sample_form("HC-6"), false).unwrap();

        assert_eq!(session.ask("Anyone there?").await.unwrap(), None);
        assert!(session.report().unwrap().chat_history.is_empty());
    }

    #[test]
    fn resume_restores_stored_case() {
        let store: Arc<dyn CaseStore> = Arc::new(InMemoryCaseStore::new());
        let mut first = session_with(store.clone(), None);
        first.submit(&sample_form("HC-8"), false).unwrap();
        first.suggest_dilemma("Futility of treatment");

        let mut second = session_with(store, None);
        assert_eq!(second.list_cases().unwrap().len(), 1);
        let report = second.resume(&CaseId::new("HC-8").unwrap()).unwrap();
        assert_eq!(report.ai_suggested_dilemma, "Futility of treatment");
        assert_eq!(second.suggested_dilemma(), Some("Futility of treatment"));

        assert!(matches!(
            second.resume(&CaseId::new("HC-9").unwrap()),
            Err(CaseError::CaseNotFound(_))
        ));
    }

    #[test]
    fn consent_can_be_generated_after_submission() {
        let mut session = session_with(Arc::new(InMemoryCaseStore::new()), None);
        assert!(matches!(session.generate_consent(), Err(CaseError::NoActiveCase)));

        session.submit(&sample_form("HC-10"), false).unwrap();
        let text = session.generate_consent().unwrap();
        assert!(text.starts_with("INFORMED CONSENT / ASSENT"));
    }
}
