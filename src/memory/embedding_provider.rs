// src/memory/embedding_provider.rs
// Remote embedding backends: Gemini and Ollama

use crate::embedder::{EmbeddingError, EmbeddingProvider, EmbeddingVector, HashEmbedder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

fn build_client(timeout: Duration) -> Result<reqwest::Client, EmbeddingError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| EmbeddingError::Request(format!("failed to build HTTP client: {}", e)))
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, EmbeddingError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    Err(EmbeddingError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Gemini `embedContent` client
pub struct GeminiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    dimension: usize,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiEmbedRequest<'a> {
    model: String,
    content: GeminiContent<'a>,
}

#[derive(Deserialize)]
struct GeminiEmbedResponse {
    embedding: GeminiEmbeddingValues,
}

#[derive(Deserialize)]
struct GeminiEmbeddingValues {
    values: Vec<f32>,
}

impl GeminiEmbedder {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let endpoint = format!(
            "{}/models/{}:embedContent",
            base_url.trim_end_matches('/'),
            model
        );
        Ok(Self {
            client: build_client(timeout)?,
            endpoint,
            model,
            api_key,
            dimension,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        debug!(model = %self.model, text_len = text.len(), "Embedding with Gemini");

        let req = GeminiEmbedRequest {
            model: format!("models/{}", self.model),
            content: GeminiContent {
                parts: vec![GeminiPart { text }],
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let parsed: GeminiEmbedResponse = error_for_status(response)
            .await?
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        Ok(parsed.embedding.values)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Ollama `/api/embeddings` client
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dimension: usize,
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(
        url: String,
        model: String,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.trim_end_matches('/').to_string(),
            model,
            dimension,
        })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        debug!(model = %self.model, text_len = text.len(), "Embedding with Ollama");

        let url = format!("{}/api/embeddings", self.url);
        let req = OllamaEmbedRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                EmbeddingError::Request(format!("Cannot reach Ollama at {}: {}", self.url, e))
            })?;

        let parsed: OllamaEmbedResponse = error_for_status(response)
            .await?
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if parsed.embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "Ollama returned an empty embedding".to_string(),
            ));
        }
        Ok(parsed.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub enum EmbeddingBackend {
    Gemini {
        base_url: String,
        api_key: String,
        model: String,
    },
    Ollama {
        ollama_url: String,
        model: String,
    },
    /// Offline feature hashing, no network
    Hash,
}

/// Factory function to create an embedding provider from config
pub fn create_embedding_provider(
    backend: &EmbeddingBackend,
    dimension: usize,
    timeout: Duration,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match backend {
        EmbeddingBackend::Gemini {
            base_url,
            api_key,
            model,
        } => {
            info!(model = %model, dimension, "Initializing Gemini embeddings");
            Ok(Arc::new(GeminiEmbedder::new(
                base_url,
                api_key.clone(),
                model.clone(),
                dimension,
                timeout,
            )?))
        }
        EmbeddingBackend::Ollama { ollama_url, model } => {
            info!(model = %model, url = %ollama_url, dimension, "Initializing Ollama embeddings");
            Ok(Arc::new(OllamaEmbedder::new(
                ollama_url.clone(),
                model.clone(),
                dimension,
                timeout,
            )?))
        }
        EmbeddingBackend::Hash => {
            info!(dimension, "Initializing offline hash embeddings");
            Ok(Arc::new(HashEmbedder::new(dimension)))
        }
    }
}
