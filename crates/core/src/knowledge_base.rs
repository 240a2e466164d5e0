//! Static dilemma knowledge base.
//!
//! Maps each dilemma category to the risks, benefits, alternatives and
//! regulatory notes quoted in the consent form. The file is loaded once at
//! startup. Entries for unknown categories are skipped with a warning and
//! missing entries or lists are reported as `None`, never as errors.

use crate::case::DilemmaCategory;
use crate::constants::DEFAULT_KNOWLEDGE_BASE_YAML;
use crate::error::{CaseError, CaseResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DilemmaEntry {
    #[serde(default)]
    pub risks: Option<Vec<String>>,
    #[serde(default)]
    pub benefits: Option<Vec<String>>,
    #[serde(default)]
    pub alternatives: Option<Vec<String>>,
    #[serde(default)]
    pub regulations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KnowledgeBase {
    entries: BTreeMap<DilemmaCategory, DilemmaEntry>,
}

impl KnowledgeBase {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The knowledge base bundled with the crate.
    pub fn builtin() -> CaseResult<Self> {
        Self::from_yaml(DEFAULT_KNOWLEDGE_BASE_YAML)
    }

    /// Parses a knowledge base from YAML (JSON is accepted as a YAML subset).
    ///
    /// # Errors
    ///
    /// Returns `CaseError::KnowledgeBase` naming the offending path when the
    /// document is malformed.
    pub fn from_yaml(content: &str) -> CaseResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(content);
        let raw: BTreeMap<String, DilemmaEntry> = serde_path_to_error::deserialize(deserializer)
            .map_err(|e| CaseError::KnowledgeBase(format!("{} at {}", e.inner(), e.path())))?;

        let mut entries = BTreeMap::new();
        for (key, entry) in raw {
            match DilemmaCategory::from_key(&key) {
                Some(category) => {
                    entries.insert(category, entry);
                }
                None => tracing::warn!("skipping unknown dilemma category in knowledge base: {}", key),
            }
        }
        Ok(Self { entries })
    }

    /// Loads the override file if one is given, otherwise the built-in base.
    pub fn load(path: Option<&Path>) -> CaseResult<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(CaseError::FileRead)?;
                let kb = Self::from_yaml(&content)?;
                tracing::info!(
                    "loaded knowledge base from {} ({} categories)",
                    path.display(),
                    kb.entries.len()
                );
                Ok(kb)
            }
            None => Self::builtin(),
        }
    }

    pub fn get(&self, category: DilemmaCategory) -> Option<&DilemmaEntry> {
        self.entries.get(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DilemmaCategory, &DilemmaEntry)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
