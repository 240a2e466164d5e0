//! Constants used throughout the bioethics core crate.

/// Default directory for case storage when no explicit directory is configured.
pub const DEFAULT_CASE_DATA_DIR: &str = "case_data";

/// Directory name for per-user case documents.
pub const USERS_DIR_NAME: &str = "users";

/// Directory name, inside a user's directory, holding case documents.
pub const CASES_DIR_NAME: &str = "cases";

/// Built-in dilemma knowledge base, used when no override file is configured.
pub const DEFAULT_KNOWLEDGE_BASE_YAML: &str = include_str!("../templates/dilemmas.yaml");

/// Placeholder text used when a field has no value.
pub const NOT_AVAILABLE: &str = "N/A";

/// Bullet used by the consent form when the knowledge base has no entry.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Text stored in place of an AI answer when the AI service fails.
pub const AI_UNAVAILABLE_TEXT: &str = "Unable to obtain a valid response from the AI service.";

/// Lowest and highest principle score a stakeholder may assign.
pub const MIN_SCORE: u8 = 0;
pub const MAX_SCORE: u8 = 5;

/// Accepted patient age range, in years.
pub const MAX_AGE_YEARS: i64 = 120;

/// Accepted gestation range, in weeks.
pub const MAX_GESTATION_WEEKS: i64 = 42;
