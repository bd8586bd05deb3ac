//! Text embedding backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::{RecommendError, Result};
use crate::retry::RetryPolicy;
use crate::vector::Vector;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

/// Converts free text into a fixed-length dense vector.
///
/// Implementations must return vectors of exactly [`dimension`](Embedder::dimension)
/// components or fail with [`RecommendError::Embedding`].
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vector>;

    /// Dimension of every vector this embedder produces.
    fn dimension(&self) -> usize;
}

/// An [`Embedder`] backed by the OpenAI embeddings API.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
    retry: RetryPolicy,
}

impl OpenAiEmbedder {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RecommendError::configuration(
                "OpenAI API key must not be empty",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                RecommendError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            retry: RetryPolicy::none(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Expected output dimension; responses of any other length are rejected.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Retry transient backend failures (network errors, 429, 5xx).
    /// Defaults to a single attempt.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Log the configured backend once at startup.
    pub fn log_configuration(&self) {
        info!(
            base_url = %self.base_url,
            model = %self.model,
            dimension = self.dimension,
            max_attempts = self.retry.max_attempts,
            "embedder configured"
        );
    }

    async fn try_embed(&self, url: &str, text: &str) -> std::result::Result<Vec<f32>, AttemptError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AttemptError::transient(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            let message = format!("API returned {}: {}", status, detail);
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                AttemptError::transient(message)
            } else {
                AttemptError::fatal(message)
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::fatal(format!("failed to parse response: {}", e)))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AttemptError::fatal("API returned no embeddings"))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vector> {
        let url = format!("{}/embeddings", self.base_url);
        debug!(model = %self.model, text_len = text.len(), "requesting embedding");

        let embedding = self
            .retry
            .run("Embedding request", || self.try_embed(&url, text), |e| e.transient)
            .await
            .map_err(|e| {
                error!(error = %e, "embedding failed");
                RecommendError::embedding(e.message)
            })?;

        if embedding.len() != self.dimension {
            return Err(RecommendError::embedding(format!(
                "expected {} dimensions, backend returned {}",
                self.dimension,
                embedding.len()
            )));
        }

        Ok(Vector::new(embedding))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// A failed attempt, tagged with whether retrying could help.
#[derive(Debug)]
struct AttemptError {
    message: String,
    transient: bool,
}

impl AttemptError {
    fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }

    fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}
