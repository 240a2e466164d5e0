//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into core
//! services. Request handling never reads process-wide environment variables.

use crate::constants::{DEFAULT_CASE_DATA_DIR, USERS_DIR_NAME};
use crate::{CaseError, CaseResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    case_data_dir: PathBuf,
    knowledge_base_path: Option<PathBuf>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `CaseError::InvalidInput` if `case_data_dir` is empty or if a
    /// knowledge base override is given that is not a readable file.
    pub fn new(case_data_dir: PathBuf, knowledge_base_path: Option<PathBuf>) -> CaseResult<Self> {
        if case_data_dir.as_os_str().is_empty() {
            return Err(CaseError::InvalidInput(
                "case data directory cannot be empty".into(),
            ));
        }

        if let Some(path) = &knowledge_base_path {
            if !path.is_file() {
                return Err(CaseError::InvalidInput(format!(
                    "knowledge base override is not a file: {}",
                    path.display()
                )));
            }
        }

        Ok(Self {
            case_data_dir,
            knowledge_base_path,
        })
    }

    pub fn case_data_dir(&self) -> &Path {
        &self.case_data_dir
    }

    pub fn users_dir(&self) -> PathBuf {
        self.case_data_dir.join(USERS_DIR_NAME)
    }

    pub fn knowledge_base_path(&self) -> Option<&Path> {
        self.knowledge_base_path.as_deref()
    }
}

/// Resolve the case data directory from an optional environment value.
///
/// Empty or whitespace-only values fall back to [`DEFAULT_CASE_DATA_DIR`].
pub fn case_data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CASE_DATA_DIR))
}

/// Resolve the optional knowledge base override from an environment value.
pub fn knowledge_base_path_from_env_value(value: Option<String>) -> Option<PathBuf> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
