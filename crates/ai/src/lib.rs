//! # Bioethics AI
//!
//! Language-model providers behind the core [`Completer`] seam: Google Gemini
//! and any OpenAI-compatible chat completions endpoint. Each call is a single
//! request bounded by the configured timeout; there are no retries.

pub mod config;
pub mod gemini;
pub mod openai;

pub use config::{AiConfig, AiConfigError, AiEnv, AiProvider};
pub use gemini::GeminiCompleter;
pub use openai::OpenAiCompleter;

use bioethics_core::{AiError, Completer};
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;

/// Longest error body kept in `AiError::Http`.
const MAX_ERROR_BODY_CHARS: usize = 512;

pub(crate) fn http_client(timeout: Duration) -> Result<Client, AiError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AiError::Transport(e.to_string()))
}

pub(crate) fn map_transport(err: reqwest::Error) -> AiError {
    if err.is_timeout() {
        AiError::Timeout
    } else {
        AiError::Transport(err.without_url().to_string())
    }
}

pub(crate) async fn check_status(response: Response) -> Result<Response, AiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect();
    Err(AiError::Http {
        status: status.as_u16(),
        body,
    })
}

/// Builds the configured provider, or `None` when no API key is set.
pub fn build_completer(cfg: &AiConfig) -> Result<Option<Arc<dyn Completer>>, AiError> {
    let Some(api_key) = cfg.api_key.clone() else {
        tracing::warn!("{}", AiError::NotConfigured);
        return Ok(None);
    };

    let completer: Arc<dyn Completer> = match cfg.provider {
        AiProvider::Gemini => Arc::new(GeminiCompleter::new(
            cfg.base_url.clone(),
            cfg.model.clone(),
            api_key,
            cfg.timeout,
        )?),
        AiProvider::OpenAi => Arc::new(OpenAiCompleter::new(
            cfg.base_url.clone(),
            cfg.model.clone(),
            api_key,
            cfg.timeout,
        )?),
    };
    tracing::info!("AI provider {} enabled with model {}", cfg.provider, cfg.model);
    Ok(Some(completer))
}
