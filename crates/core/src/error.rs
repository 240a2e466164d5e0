use bioethics_types::TextError;

#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid text: {0}")]
    InvalidText(#[from] TextError),
    #[error("the case id (clinical history number) is required")]
    MissingCaseId,
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("no case is active in this session")]
    NoActiveCase,
    #[error("case not found: {0}")]
    CaseNotFound(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write case file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read case file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize case: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize case: {0}")]
    Deserialization(serde_json::Error),
    #[error("knowledge base error: {0}")]
    KnowledgeBase(String),
    #[error("case store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("failed to render PDF: {0}")]
    Pdf(String),
}

pub type CaseResult<T> = std::result::Result<T, CaseError>;

/// Failures of the external language-model service.
///
/// These never abort a pipeline; the session logs them and degrades.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI features are disabled: no API key configured")]
    NotConfigured,
    #[error("AI request timed out")]
    Timeout,
    #[error("AI service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("could not reach AI service: {0}")]
    Transport(String),
    #[error("unexpected AI response: {0}")]
    UnexpectedResponse(String),
}
