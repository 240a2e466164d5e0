//! Seam to the external language-model service.
//!
//! Core only knows that a prompt goes in and text comes out. Provider
//! implementations live in the `bioethics-ai` crate.

use crate::error::AiError;
use async_trait::async_trait;

#[async_trait]
pub trait Completer: Send + Sync {
    /// Sends one prompt and returns the model's text.
    ///
    /// Implementations must give up after their configured timeout and must
    /// never return an empty success; an empty reply is `AiError::UnexpectedResponse`.
    async fn complete(&self, prompt: &str) -> Result<String, AiError>;
}
