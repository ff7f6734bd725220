use std::time::Duration;

use ragbook_core::error::{Error, Result};
use ragbook_core::traits::CompletionService;
use ragbook_core::types::ChatMessage;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

const SERVICE: &str = "completion";

/// Blocking client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiChatClient {
    client: Client,
    endpoint: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAiChatClient {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::InvalidConfig("missing OpenAI API key".into()));
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|_| Error::InvalidConfig("invalid OpenAI API key".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Operation(format!("failed to build OpenAI HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model,
            temperature,
            max_tokens,
        })
    }
}

impl CompletionService for OpenAiChatClient {
    fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages,
        };
        let resp = self.client.post(&self.endpoint).json(&body).send().map_err(|e| {
            if e.is_timeout() {
                Error::timeout(SERVICE, format!("chat completion timed out: {e}"))
            } else {
                Error::upstream(SERVICE, format!("failed to call chat completions: {e}"))
            }
        })?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::upstream(SERVICE, format!("returned {status}: {text}")));
        }
        let parsed: ChatResponse = resp
            .json()
            .map_err(|e| Error::upstream(SERVICE, format!("failed to parse chat response: {e}")))?;
        let answer = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| Error::upstream(SERVICE, "response contained no message content"))?;
        debug!(model = %self.model, chars = answer.len(), "chat completion");
        Ok(answer)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
