//! Client for OpenAI-compatible `/chat/completions` endpoints.

use crate::{check_status, http_client, map_transport};
use async_trait::async_trait;
use bioethics_core::{AiError, Completer};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

impl ChatCompletionResponse {
    pub(crate) fn into_text(self) -> Result<String, AiError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AiError::UnexpectedResponse("response has no choice content".into()))
    }
}

pub struct OpenAiCompleter {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiCompleter {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Completer for OpenAiCompleter {
    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!("calling chat completions model {}", self.model);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        let response = check_status(response).await?;
        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AiError::UnexpectedResponse(e.to_string()))?;
        parsed.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice() {
        let parsed: ChatCompletionResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Respect autonomy."}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.into_text().unwrap(), "Respect autonomy.");
    }

    #[test]
    fn null_or_blank_content_is_unexpected() {
        for json in [
            r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
            r#"{"choices":[{"message":{"role":"assistant","content":"  "}}]}"#,
            r#"{"choices":[]}"#,
        ] {
            let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
            assert!(matches!(parsed.into_text(), Err(AiError::UnexpectedResponse(_))));
        }
    }
}
