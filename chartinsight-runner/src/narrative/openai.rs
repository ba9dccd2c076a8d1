//! OpenAI-compatible chat-completions provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::json;

use super::llm::TextProvider;
use crate::config::LlmConfig;
use crate::error::NarrativeProviderError;

/// Longest provider error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct OpenAiProvider {
    client: Client,
    api_key: Secret<String>,
    model: String,
    endpoint: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, NarrativeProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or(NarrativeProviderError::MissingCredentials)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NarrativeProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            temperature: config.temperature,
            timeout: config.timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TextProvider for OpenAiProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete_json(
        &self,
        system: &str,
        user: &str,
    ) -> Result<String, NarrativeProviderError> {
        let payload = json!({
            "model": self.model,
            "temperature": self.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        tracing::debug!(model = %self.model, endpoint = %self.endpoint, "sending chat completion");

        let response = self
            .client
            .post(&self.endpoint)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NarrativeProviderError::Timeout(self.timeout)
                } else {
                    NarrativeProviderError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(NarrativeProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| NarrativeProviderError::MalformedJson(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| NarrativeProviderError::Schema("response has no message content".into()))
    }
}
