//! # API REST
//!
//! REST API for bioethics case deliberation.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Every request builds its own [`CaseSession`] for the user named in the
//! path, resumes the case it targets and returns the session's notices with
//! the result. No deliberation state lives in the server between requests.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, State},
    http::{header, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use bioethics_core::{
    export::{render_report_markdown, safe_file_stem},
    pdf::{render_consent_pdf, render_report_pdf},
    prompts::GUIDED_QUESTIONS, CaseError, CaseForm, CaseId,
    CaseSession, DilemmaCategory, Notice, NoticeLevel, Report, SessionServices, UserId,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    services: SessionServices,
}

impl AppState {
    pub fn new(services: SessionServices) -> Self {
        Self { services }
    }

    fn session(&self, user_id: &str, analyst: Option<&str>) -> Result<CaseSession, ApiError> {
        let user = UserId::new(user_id).map_err(|e| {
            tracing::warn!("Invalid user id: {:?}", e);
            (StatusCode::BAD_REQUEST, format!("invalid user id: {e}"))
        })?;
        let analyst = analyst
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(user_id)
            .to_string();
        Ok(CaseSession::new(self.services.clone(), user, analyst))
    }

    /// Session with the addressed case already active.
    fn session_for_case(&self, user_id: &str, case_id: &str) -> Result<CaseSession, ApiError> {
        let mut session = self.session(user_id, None)?;
        let case_id = CaseId::new(case_id).map_err(|e| {
            tracing::warn!("Invalid case id: {:?}", e);
            (StatusCode::BAD_REQUEST, format!("invalid case id: {e}"))
        })?;
        session
            .resume(&case_id)
            .map_err(|e| error_response("Resume case error", e))?;
        Ok(session)
    }
}

type ApiError = (StatusCode, String);

fn error_response(context: &str, err: CaseError) -> ApiError {
    let status = match &err {
        CaseError::InvalidInput(_)
        | CaseError::InvalidText(_)
        | CaseError::MissingCaseId
        | CaseError::OutOfRange { .. } => StatusCode::BAD_REQUEST,
        CaseError::NoActiveCase | CaseError::CaseNotFound(_) => StatusCode::NOT_FOUND,
        CaseError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("{}: {:?}", context, err);
        (status, "Internal error".into())
    } else {
        tracing::warn!("{}: {}", context, err);
        (status, err.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
    pub ai_enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NoticeRes {
    /// One of `info`, `warning` or `error`.
    pub level: String,
    pub message: String,
}

impl From<Notice> for NoticeRes {
    fn from(notice: Notice) -> Self {
        let level = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        Self {
            level: level.into(),
            message: notice.message,
        }
    }
}

fn notices(session: &mut CaseSession) -> Vec<NoticeRes> {
    session.take_notices().into_iter().map(NoticeRes::from).collect()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DilemmaRes {
    pub key: String,
    pub label: String,
    pub risks: Vec<String>,
    pub benefits: Vec<String>,
    pub alternatives: Vec<String>,
    pub regulations: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListDilemmasRes {
    pub dilemmas: Vec<DilemmaRes>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GuidedQuestionsRes {
    pub questions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalyseHistoryReq {
    pub clinical_history: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalyseHistoryRes {
    pub analysis: Option<String>,
    pub notices: Vec<NoticeRes>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CaseSummaryRes {
    pub case_id: String,
    pub analysed_at: String,
    pub analyst: String,
    pub patient_summary: String,
    pub dilemma: String,
    pub severity: String,
}

impl From<&Report> for CaseSummaryRes {
    fn from(report: &Report) -> Self {
        Self {
            case_id: report.case_id.to_string(),
            analysed_at: report.analysed_at.to_rfc3339(),
            analyst: report.analyst.clone(),
            patient_summary: report.patient_summary.clone(),
            dilemma: report.dilemma.label().into(),
            severity: report.assessment.severity.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListCasesRes {
    pub cases: Vec<CaseSummaryRes>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitCaseReq {
    /// Fills the analyst name when the form leaves it blank.
    #[serde(default)]
    pub analyst: Option<String>,
    #[serde(default)]
    pub generate_consent: bool,
    /// Dilemma suggested by the AI, recorded on the report when present.
    #[serde(default)]
    pub ai_suggested_dilemma: Option<String>,
    #[schema(value_type = Object)]
    pub case: CaseForm,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitCaseRes {
    #[schema(value_type = Object)]
    pub report: Report,
    pub consent_text: Option<String>,
    pub notices: Vec<NoticeRes>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CaseRes {
    #[schema(value_type = Object)]
    pub report: Report,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NarrativeRes {
    pub deliberative_analysis: Option<String>,
    pub notices: Vec<NoticeRes>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatReq {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatRes {
    pub reply: Option<String>,
    pub message_count: usize,
    pub notices: Vec<NoticeRes>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConsentRes {
    pub consent_text: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_dilemmas,
        guided_questions,
        analyse_clinical_history,
        list_cases,
        submit_case,
        get_case,
        generate_narrative,
        chat,
        consent,
        consent_pdf,
        export_markdown,
        export_pdf,
    ),
    components(schemas(
        HealthRes,
        NoticeRes,
        DilemmaRes,
        ListDilemmasRes,
        GuidedQuestionsRes,
        AnalyseHistoryReq,
        AnalyseHistoryRes,
        CaseSummaryRes,
        ListCasesRes,
        SubmitCaseReq,
        SubmitCaseRes,
        CaseRes,
        NarrativeRes,
        ChatReq,
        ChatRes,
        ConsentRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/dilemmas", get(list_dilemmas))
        .route("/questions", get(guided_questions))
        .route(
            "/users/:user_id/clinical-history-analysis",
            post(analyse_clinical_history),
        )
        .route("/users/:user_id/cases", get(list_cases).post(submit_case))
        .route("/users/:user_id/cases/:case_id", get(get_case))
        .route(
            "/users/:user_id/cases/:case_id/narrative",
            post(generate_narrative),
        )
        .route("/users/:user_id/cases/:case_id/chat", post(chat))
        .route("/users/:user_id/cases/:case_id/consent", get(consent))
        .route("/users/:user_id/cases/:case_id/consent/pdf", get(consent_pdf))
        .route("/users/:user_id/cases/:case_id/export", get(export_markdown))
        .route("/users/:user_id/cases/:case_id/export/pdf", get(export_pdf))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Bioethics REST API is alive".into(),
        ai_enabled: state.services.completer.is_some(),
    })
}

#[utoipa::path(
    get,
    path = "/dilemmas",
    responses(
        (status = 200, description = "Dilemma categories with their knowledge base entries", body = ListDilemmasRes)
    )
)]
#[axum::debug_handler]
async fn list_dilemmas(State(state): State<AppState>) -> Json<ListDilemmasRes> {
    let kb = &state.services.knowledge_base;
    let dilemmas = DilemmaCategory::ALL
        .into_iter()
        .map(|category| {
            let entry = kb.get(category).cloned().unwrap_or_default();
            DilemmaRes {
                key: category.key().into(),
                label: category.label().into(),
                risks: entry.risks.unwrap_or_default(),
                benefits: entry.benefits.unwrap_or_default(),
                alternatives: entry.alternatives.unwrap_or_default(),
                regulations: entry.regulations.unwrap_or_default(),
            }
        })
        .collect();
    Json(ListDilemmasRes { dilemmas })
}

#[utoipa::path(
    get,
    path = "/questions",
    responses(
        (status = 200, description = "Suggested deliberation questions", body = GuidedQuestionsRes)
    )
)]
#[axum::debug_handler]
async fn guided_questions() -> Json<GuidedQuestionsRes> {
    Json(GuidedQuestionsRes {
        questions: GUIDED_QUESTIONS.iter().map(|q| q.to_string()).collect(),
    })
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/clinical-history-analysis",
    params(("user_id" = String, Path, description = "Owner of the cases")),
    request_body = AnalyseHistoryReq,
    responses(
        (status = 200, description = "Preliminary AI analysis", body = AnalyseHistoryRes),
        (status = 400, description = "Bad request")
    )
)]
/// Preliminary AI extraction of the bioethical elements of a clinical history.
///
/// The analysis is not stored; clients send it back in the case form's
/// `ai_clinical_history_analysis` field when submitting.
#[axum::debug_handler]
async fn analyse_clinical_history(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
    Json(req): Json<AnalyseHistoryReq>,
) -> Result<Json<AnalyseHistoryRes>, ApiError> {
    let mut session = state.session(&user_id, None)?;
    let analysis = session
        .analyse_clinical_history(&req.clinical_history)
        .await
        .map_err(|e| error_response("Clinical history analysis error", e))?
        .map(str::to_string);
    Ok(Json(AnalyseHistoryRes {
        analysis,
        notices: notices(&mut session),
    }))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/cases",
    params(("user_id" = String, Path, description = "Owner of the cases")),
    responses(
        (status = 200, description = "The user's saved cases", body = ListCasesRes),
        (status = 503, description = "Case store unavailable")
    )
)]
#[axum::debug_handler]
async fn list_cases(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
) -> Result<Json<ListCasesRes>, ApiError> {
    let session = state.session(&user_id, None)?;
    let cases = session
        .list_cases()
        .map_err(|e| error_response("List cases error", e))?;
    Ok(Json(ListCasesRes {
        cases: cases.values().map(CaseSummaryRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/cases",
    params(("user_id" = String, Path, description = "Owner of the case")),
    request_body = SubmitCaseReq,
    responses(
        (status = 201, description = "Case assessed and saved", body = SubmitCaseRes),
        (status = 400, description = "Bad request")
    )
)]
/// Submit a case form.
///
/// The form is validated, scored and assembled into a report which is then
/// saved. A storage failure does not fail the request; it is reported in
/// `notices`.
#[axum::debug_handler]
async fn submit_case(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
    Json(req): Json<SubmitCaseReq>,
) -> Result<(StatusCode, Json<SubmitCaseRes>), ApiError> {
    let mut session = state.session(&user_id, req.analyst.as_deref())?;
    if let Some(suggestion) = req.ai_suggested_dilemma.filter(|s| !s.trim().is_empty()) {
        session.suggest_dilemma(suggestion);
    }
    let report = session
        .submit(&req.case, req.generate_consent)
        .map_err(|e| error_response("Submit case error", e))?
        .clone();
    let consent_text = session.consent_text().map(str::to_string);

    Ok((
        StatusCode::CREATED,
        Json(SubmitCaseRes {
            report,
            consent_text,
            notices: notices(&mut session),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/cases/{case_id}",
    params(
        ("user_id" = String, Path, description = "Owner of the case"),
        ("case_id" = String, Path, description = "Case id (clinical history number)")
    ),
    responses(
        (status = 200, description = "Stored report", body = CaseRes),
        (status = 404, description = "Case not found")
    )
)]
#[axum::debug_handler]
async fn get_case(
    State(state): State<AppState>,
    AxumPath((user_id, case_id)): AxumPath<(String, String)>,
) -> Result<Json<CaseRes>, ApiError> {
    let session = state.session_for_case(&user_id, &case_id)?;
    let report = session
        .report()
        .cloned()
        .ok_or_else(|| error_response("Get case error", CaseError::NoActiveCase))?;
    Ok(Json(CaseRes { report }))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/cases/{case_id}/narrative",
    params(
        ("user_id" = String, Path, description = "Owner of the case"),
        ("case_id" = String, Path, description = "Case id (clinical history number)")
    ),
    responses(
        (status = 200, description = "Deliberative analysis, absent when the AI failed", body = NarrativeRes),
        (status = 404, description = "Case not found")
    )
)]
/// Generate (or regenerate) the AI deliberative analysis of a case.
#[axum::debug_handler]
async fn generate_narrative(
    State(state): State<AppState>,
    AxumPath((user_id, case_id)): AxumPath<(String, String)>,
) -> Result<Json<NarrativeRes>, ApiError> {
    let mut session = state.session_for_case(&user_id, &case_id)?;
    let deliberative_analysis = session
        .generate_narrative()
        .await
        .map_err(|e| error_response("Generate narrative error", e))?
        .map(str::to_string);
    Ok(Json(NarrativeRes {
        deliberative_analysis,
        notices: notices(&mut session),
    }))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/cases/{case_id}/chat",
    params(
        ("user_id" = String, Path, description = "Owner of the case"),
        ("case_id" = String, Path, description = "Case id (clinical history number)")
    ),
    request_body = ChatReq,
    responses(
        (status = 200, description = "Assistant reply", body = ChatRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Case not found")
    )
)]
/// One deliberation chat turn on a stored case.
#[axum::debug_handler]
async fn chat(
    State(state): State<AppState>,
    AxumPath((user_id, case_id)): AxumPath<(String, String)>,
    Json(req): Json<ChatReq>,
) -> Result<Json<ChatRes>, ApiError> {
    let mut session = state.session_for_case(&user_id, &case_id)?;
    let reply = session
        .ask(&req.question)
        .await
        .map_err(|e| error_response("Chat error", e))?
        .map(|message| message.content);
    let message_count = session.report().map_or(0, |r| r.chat_history.len());
    Ok(Json(ChatRes {
        reply,
        message_count,
        notices: notices(&mut session),
    }))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/cases/{case_id}/consent",
    params(
        ("user_id" = String, Path, description = "Owner of the case"),
        ("case_id" = String, Path, description = "Case id (clinical history number)")
    ),
    responses(
        (status = 200, description = "Informed consent text", body = ConsentRes),
        (status = 404, description = "Case not found")
    )
)]
#[axum::debug_handler]
async fn consent(
    State(state): State<AppState>,
    AxumPath((user_id, case_id)): AxumPath<(String, String)>,
) -> Result<Json<ConsentRes>, ApiError> {
    let mut session = state.session_for_case(&user_id, &case_id)?;
    let consent_text = session
        .generate_consent()
        .map_err(|e| error_response("Consent error", e))?
        .to_string();
    Ok(Json(ConsentRes { consent_text }))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/cases/{case_id}/export",
    params(
        ("user_id" = String, Path, description = "Owner of the case"),
        ("case_id" = String, Path, description = "Case id (clinical history number)")
    ),
    responses(
        (status = 200, description = "Report as a Markdown document", body = String, content_type = "text/markdown"),
        (status = 404, description = "Case not found")
    )
)]
#[axum::debug_handler]
async fn export_markdown(
    State(state): State<AppState>,
    AxumPath((user_id, case_id)): AxumPath<(String, String)>,
) -> Result<([(header::HeaderName, &'static str); 1], String), ApiError> {
    let session = state.session_for_case(&user_id, &case_id)?;
    let report = session
        .report()
        .ok_or_else(|| error_response("Export error", CaseError::NoActiveCase))?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        render_report_markdown(report),
    ))
}

type PdfResponse = ([(header::HeaderName, String); 2], Vec<u8>);

fn pdf_response(file_name: String, bytes: Vec<u8>) -> PdfResponse {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/cases/{case_id}/export/pdf",
    params(
        ("user_id" = String, Path, description = "Owner of the case"),
        ("case_id" = String, Path, description = "Case id (clinical history number)")
    ),
    responses(
        (status = 200, description = "Report as a PDF document", body = Vec<u8>, content_type = "application/pdf"),
        (status = 404, description = "Case not found")
    )
)]
#[axum::debug_handler]
async fn export_pdf(
    State(state): State<AppState>,
    AxumPath((user_id, case_id)): AxumPath<(String, String)>,
) -> Result<PdfResponse, ApiError> {
    let session = state.session_for_case(&user_id, &case_id)?;
    let report = session
        .report()
        .ok_or_else(|| error_response("Export error", CaseError::NoActiveCase))?;
    let bytes = render_report_pdf(report).map_err(|e| error_response("PDF export error", e))?;
    Ok(pdf_response(
        format!("Report_{}.pdf", safe_file_stem(&case_id)),
        bytes,
    ))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/cases/{case_id}/consent/pdf",
    params(
        ("user_id" = String, Path, description = "Owner of the case"),
        ("case_id" = String, Path, description = "Case id (clinical history number)")
    ),
    responses(
        (status = 200, description = "Informed consent as a PDF document", body = Vec<u8>, content_type = "application/pdf"),
        (status = 404, description = "Case not found")
    )
)]
#[axum::debug_handler]
async fn consent_pdf(
    State(state): State<AppState>,
    AxumPath((user_id, case_id)): AxumPath<(String, String)>,
) -> Result<PdfResponse, ApiError> {
    let mut session = state.session_for_case(&user_id, &case_id)?;
    let text = session
        .generate_consent()
        .map_err(|e| error_response("Consent error", e))?;
    let bytes = render_consent_pdf(text).map_err(|e| error_response("PDF consent error", e))?;
    Ok(pdf_response(
        format!("Consent_{}.pdf", safe_file_stem(&case_id)),
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use bioethics_core::{AiError, Completer, InMemoryCaseStore, KnowledgeBase};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Canned;

    #[async_trait]
    impl Completer for Canned {
        async fn complete(&self, _prompt: &str) -> Result<String, AiError> {
            Ok("Seek a family meeting.".into())
        }
    }

    fn app(completer: Option<Arc<dyn Completer>>) -> Router {
        router(AppState::new(SessionServices {
            store: Arc::new(InMemoryCaseStore::new()),
            knowledge_base: Arc::new(KnowledgeBase::builtin().unwrap()),
            completer,
        }))
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn submission(case_id: &str) -> serde_json::Value {
        serde_json::json!({
            "analyst": "dr.vega@example.org",
            "generate_consent": true,
            "case": {
                "case_id": case_id,
                "patient_name": "Mateo",
                "age_years": 80,
                "dilemma": "treatment_refusal",
                "perspectives": {
                    "medical": {"autonomy": 5, "beneficence": 5, "non_maleficence": 5, "justice": 5},
                    "family": {"autonomy": 0, "beneficence": 0, "non_maleficence": 0, "justice": 0},
                    "committee": {"autonomy": 3, "beneficence": 3, "non_maleficence": 3, "justice": 3}
                }
            }
        })
    }

    #[tokio::test]
    async fn health_reports_ai_status() {
        let response = app(None).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["ai_enabled"], false);
    }

    #[tokio::test]
    async fn catalogue_endpoints_list_all_entries() {
        let app = app(None);
        let dilemmas = body_json(app.clone().oneshot(get("/dilemmas")).await.unwrap()).await;
        assert_eq!(dilemmas["dilemmas"].as_array().unwrap().len(), 9);
        assert_eq!(dilemmas["dilemmas"][0]["key"], "end_of_life_care");

        let questions = body_json(app.oneshot(get("/questions")).await.unwrap()).await;
        assert_eq!(questions["questions"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn submitted_case_can_be_listed_and_fetched() {
        let app = app(None);
        let response = app
            .clone()
            .oneshot(json_request("POST", "/users/u1/cases", submission("HC-1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["report"]["assessment"]["severity"], "critical");
        assert_eq!(body["report"]["analyst"], "dr.vega@example.org");
        assert!(body["consent_text"].as_str().unwrap().contains("Case ID: HC-1"));

        let listed = body_json(app.clone().oneshot(get("/users/u1/cases")).await.unwrap()).await;
        assert_eq!(listed["cases"][0]["case_id"], "HC-1");
        assert_eq!(listed["cases"][0]["severity"], "Critical");

        let other = body_json(app.clone().oneshot(get("/users/u2/cases")).await.unwrap()).await;
        assert!(other["cases"].as_array().unwrap().is_empty());

        let fetched = app.oneshot(get("/users/u1/cases/HC-1")).await.unwrap();
        assert_eq!(fetched.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_submissions_are_bad_requests() {
        let app = app(None);
        let mut missing_id = submission("HC-1");
        missing_id["case"]["case_id"] = serde_json::json!("  ");
        let response = app
            .clone()
            .oneshot(json_request("POST", "/users/u1/cases", missing_id))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut out_of_range = submission("HC-2");
        out_of_range["case"]["age_years"] = serde_json::json!(130);
        let response = app
            .oneshot(json_request("POST", "/users/u1/cases", out_of_range))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_case_is_not_found() {
        let response = app(None).oneshot(get("/users/u1/cases/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn chat_and_narrative_are_persisted() {
        let app = app(Some(Arc::new(Canned)));
        app.clone()
            .oneshot(json_request("POST", "/users/u1/cases", submission("HC-3")))
            .await
            .unwrap();

        let chat = body_json(
            app.clone()
                .oneshot(json_request(
                    "POST",
                    "/users/u1/cases/HC-3/chat",
                    serde_json::json!({"question": "What now?"}),
                ))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(chat["reply"], "Seek a family meeting.");
        assert_eq!(chat["message_count"], 2);

        let narrative = body_json(
            app.clone()
                .oneshot(json_request("POST", "/users/u1/cases/HC-3/narrative", serde_json::json!({})))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(narrative["deliberative_analysis"], "Seek a family meeting.");

        let fetched = body_json(app.oneshot(get("/users/u1/cases/HC-3")).await.unwrap()).await;
        assert_eq!(fetched["report"]["chat_history"].as_array().unwrap().len(), 2);
        assert_eq!(fetched["report"]["deliberative_analysis"], "Seek a family meeting.");
    }

    #[tokio::test]
    async fn narrative_without_ai_returns_warning_notice() {
        let app = app(None);
        app.clone()
            .oneshot(json_request("POST", "/users/u1/cases", submission("HC-4")))
            .await
            .unwrap();

        let response = app
            .oneshot(json_request("POST", "/users/u1/cases/HC-4/narrative", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["deliberative_analysis"].is_null());
        assert_eq!(body["notices"][0]["level"], "warning");
    }

    #[tokio::test]
    async fn export_returns_markdown() {
        let app = app(None);
        app.clone()
            .oneshot(json_request("POST", "/users/u1/cases", submission("HC-5")))
            .await
            .unwrap();

        let response = app.oneshot(get("/users/u1/cases/HC-5/export")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/markdown; charset=utf-8"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("# Deliberative Report"));
    }

    #[tokio::test]
    async fn report_and_consent_download_as_pdf() {
        let app = app(None);
        app.clone()
            .oneshot(json_request("POST", "/users/u1/cases", submission("HC 6")))
            .await
            .unwrap();

        let response = app.clone().oneshot(get("/users/u1/cases/HC%206/export/pdf")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Report_HC_6.pdf\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let response = app.clone().oneshot(get("/users/u1/cases/HC%206/consent/pdf")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let missing = app.oneshot(get("/users/u1/cases/nope/export/pdf")).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn submission_records_suggested_dilemma() {
        let app = app(None);
        let mut body = submission("HC-7");
        body["ai_suggested_dilemma"] = serde_json::json!("Futility of treatment");
        let response = app
            .clone()
            .oneshot(json_request("POST", "/users/u1/cases", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let fetched = body_json(app.oneshot(get("/users/u1/cases/HC-7")).await.unwrap()).await;
        assert_eq!(fetched["report"]["ai_suggested_dilemma"], "Futility of treatment");
    }
}
