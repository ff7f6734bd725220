//! OpenAI-based embedding client implementation.

use std::thread;
use std::time::Duration;

use ragbook_core::error::{Error, Result};
use ragbook_core::traits::Embedder;
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const SERVICE: &str = "embedding";

/// Blocking embeddings client that talks to OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    id: String,
    dimensions: Option<usize>,
    /// Retries after the first attempt.
    max_retries: usize,
    batch_size: usize,
    retry_base: Duration,
}

impl OpenAiEmbedder {
    /// Builds a new OpenAI embeddings client.
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        dimensions: Option<usize>,
        timeout: Duration,
        max_retries: usize,
        batch_size: usize,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::InvalidConfig("missing OpenAI API key".into()));
        }
        if model.trim().is_empty() {
            return Err(Error::InvalidConfig("missing OpenAI model name".into()));
        }
        let mut headers = reqwest::header::HeaderMap::new();
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
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            id: format!("openai:{model}"),
            model,
            dimensions,
            max_retries,
            batch_size: batch_size.max(1),
            retry_base: Duration::from_millis(500),
        })
    }

    /// Overrides the base delay of the exponential retry backoff.
    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    /// Sends one request worth of inputs and returns vectors in input order.
    fn request_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0usize;
        loop {
            let request = EmbeddingRequest { model: &self.model, input: inputs, dimensions: self.dimensions };
            let response = self.client.post(&self.endpoint).json(&request).send();
            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let mut parsed: EmbeddingResponse = resp
                            .json()
                            .map_err(|e| Error::upstream(SERVICE, format!("failed to parse embedding response: {e}")))?;
                        parsed.data.sort_by_key(|entry| entry.index);
                        if parsed.data.len() != inputs.len() {
                            return Err(Error::upstream(
                                SERVICE,
                                format!("returned {} embeddings for {} inputs", parsed.data.len(), inputs.len()),
                            ));
                        }
                        return Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect());
                    }

                    let body = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt < self.max_retries {
                        attempt += 1;
                        warn!(%status, attempt, "embedding request failed, retrying");
                        thread::sleep(self.retry_backoff(attempt));
                        continue;
                    }
                    return Err(Error::upstream(SERVICE, format!("request failed ({status}): {body}")));
                }
                Err(err) => {
                    if is_retryable_error(&err) && attempt < self.max_retries {
                        attempt += 1;
                        warn!(error = %err, attempt, "embedding transport error, retrying");
                        thread::sleep(self.retry_backoff(attempt));
                        continue;
                    }
                    if err.is_timeout() {
                        return Err(Error::timeout(SERVICE, format!("request timed out: {err}")));
                    }
                    return Err(Error::upstream(SERVICE, err.to_string()));
                }
            }
        }
    }

    fn retry_backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        self.retry_base * (1 << capped)
    }
}

impl Embedder for OpenAiEmbedder {
    fn embedder_id(&self) -> &str { &self.id }

    fn dim(&self) -> Option<usize> { self.dimensions }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!(size = batch.len(), "embedding batch");
            out.extend(self.request_batch(batch)?);
        }
        Ok(out)
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request() || err.is_decode()
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
