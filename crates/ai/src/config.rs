//! AI provider configuration.
//!
//! Resolved once at startup from environment values; request handling never
//! reads the environment.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AiConfigError {
    #[error("unknown AI provider '{0}' (expected 'gemini' or 'openai')")]
    UnknownProvider(String),
    #[error("AI_TIMEOUT_SECS must be a positive integer, got '{0}'")]
    InvalidTimeout(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AiProvider {
    #[default]
    Gemini,
    OpenAi,
}

impl AiProvider {
    fn default_model(self) -> &'static str {
        match self {
            AiProvider::Gemini => DEFAULT_GEMINI_MODEL,
            AiProvider::OpenAi => DEFAULT_OPENAI_MODEL,
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            AiProvider::Gemini => DEFAULT_GEMINI_BASE_URL,
            AiProvider::OpenAi => DEFAULT_OPENAI_BASE_URL,
        }
    }
}

impl FromStr for AiProvider {
    type Err = AiConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(AiProvider::Gemini),
            "openai" | "openai-compatible" => Ok(AiProvider::OpenAi),
            other => Err(AiConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AiProvider::Gemini => "gemini",
            AiProvider::OpenAi => "openai",
        })
    }
}

/// Raw environment values, one field per variable.
#[derive(Debug, Clone, Default)]
pub struct AiEnv {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<String>,
}

impl AiEnv {
    /// Reads `AI_PROVIDER`, `AI_API_KEY`, `GEMINI_API_KEY`, `AI_MODEL`,
    /// `AI_BASE_URL` and `AI_TIMEOUT_SECS`.
    pub fn from_process_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();
        Self {
            provider: var("AI_PROVIDER"),
            api_key: var("AI_API_KEY"),
            gemini_api_key: var("GEMINI_API_KEY"),
            model: var("AI_MODEL"),
            base_url: var("AI_BASE_URL"),
            timeout_secs: var("AI_TIMEOUT_SECS"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AiConfig {
    pub provider: AiProvider,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

// Keeps the key out of logs.
impl fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AiConfig {
    pub fn from_env(env: AiEnv) -> Result<Self, AiConfigError> {
        let provider = match non_blank(env.provider) {
            Some(p) => p.parse()?,
            None => AiProvider::default(),
        };

        let timeout = match non_blank(env.timeout_secs) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(AiConfigError::InvalidTimeout(raw)),
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let api_key = non_blank(env.api_key).or_else(|| match provider {
            AiProvider::Gemini => non_blank(env.gemini_api_key),
            AiProvider::OpenAi => None,
        });

        Ok(Self {
            provider,
            api_key,
            model: non_blank(env.model).unwrap_or_else(|| provider.default_model().to_string()),
            base_url: non_blank(env.base_url)
                .unwrap_or_else(|| provider.default_base_url().to_string()),
            timeout,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}
