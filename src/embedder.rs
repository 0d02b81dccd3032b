// src/embedder.rs
// Embedding provider seam plus a caching, bounded-concurrency service on top

use crate::progress::{EmbeddingFallback, IngestObserver, IngestProgress};
use futures_util::stream::{self, StreamExt};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Embedding vector (768-dimensional by default)
pub type EmbeddingVector = Vec<f32>;

/// Default dimensionality of embedding vectors.
pub const DEFAULT_DIMENSION: usize = 768;

#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("Embedding request failed: {0}")]
    Request(String),

    #[error("Embedding API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("Embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Nothing to embed")]
    EmptyInput,
}

/// Embedding provider trait - implement this to support new backends
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError>;
    fn dimension(&self) -> usize;
    fn model_name(&self) -> &str;
}

/// Zero-filled vector of the given dimensionality.
pub fn zero_vector(dimension: usize) -> EmbeddingVector {
    vec![0.0; dimension]
}

/// Offline embedder: hashes each normalised word into a signed bucket and
/// L2-normalises the counts.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_sync(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let mut vec = zero_vector(self.dimension);
        let mut words = 0usize;

        for raw in text.split_whitespace() {
            let word: String = raw
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            if word.is_empty() {
                continue;
            }
            let hash = seahash::hash(word.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vec[bucket] += sign;
            words += 1;
        }

        if words == 0 {
            return Err(EmbeddingError::EmptyInput);
        }

        let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vec.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vec)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        self.embed_sync(text)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "seahash-bow"
    }
}

/// Embedding cache using LRU strategy
type EmbeddingCache = LruCache<String, EmbeddingVector>;

/// Configuration for the embedding service
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Maximum number of in-flight provider calls during ingestion
    pub concurrency: usize,
    pub cache_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            cache_size: 10_000,
        }
    }
}

/// Result of embedding one chunk during ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkEmbedding {
    pub vector: EmbeddingVector,
    /// True when the provider failed and the zero vector was substituted.
    pub degraded: bool,
}

impl ChunkEmbedding {
    fn fallback(dimension: usize) -> Self {
        Self {
            vector: zero_vector(dimension),
            degraded: true,
        }
    }
}

/// Thread-safe async embedding service with caching and bounded concurrency
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    config: EmbeddingConfig,
    cache: Arc<RwLock<EmbeddingCache>>,
}

impl EmbeddingService {
    /// Create a new embedding service
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: EmbeddingConfig) -> Self {
        let cache_size = NonZeroUsize::new(config.cache_size).unwrap_or(NonZeroUsize::MIN);
        let cache = LruCache::new(cache_size);

        info!(
            model = provider.model_name(),
            dimension = provider.dimension(),
            concurrency = config.concurrency,
            cache_size = config.cache_size,
            "Initializing EmbeddingService"
        );

        Self {
            provider,
            config,
            cache: Arc::new(RwLock::new(cache)),
        }
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed a single text, with cache lookup. Failures are not cached.
    pub async fn embed_text(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let key = format!("{:x}", seahash::hash(text.as_bytes()));

        {
            let mut cache = self.cache.write().await;
            if let Some(embedding) = cache.get(&key) {
                debug!(cache_key = %key, text_len = text.len(), "Cache hit for embedding");
                return Ok(embedding.clone());
            }
        }

        debug!(text_len = text.len(), "Generating embedding");
        let embedding = self.provider.embed(text).await?;

        let expected = self.provider.dimension();
        if embedding.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }

        {
            let mut cache = self.cache.write().await;
            cache.put(key, embedding.clone());
        }

        Ok(embedding)
    }

    /// Embed a question. Errors propagate; there is no fallback vector here.
    pub async fn embed_query(&self, query: &str) -> Result<EmbeddingVector, EmbeddingError> {
        debug!(query = %query, "Generating query embedding");
        self.embed_text(query).await
    }

    /// Embed every chunk, keeping results aligned with the input order.
    ///
    /// A failed chunk gets the zero vector and is reported to `observer`;
    /// progress is reported after each chunk completes.
    pub async fn embed_chunks(
        &self,
        texts: &[String],
        observer: &dyn IngestObserver,
    ) -> Vec<ChunkEmbedding> {
        let total = texts.len();
        let dimension = self.dimension();
        let concurrency = self.config.concurrency.max(1);

        info!(total_texts = total, concurrency, "Starting chunk embedding");

        let mut slots: Vec<Option<ChunkEmbedding>> = (0..total).map(|_| None).collect();
        let mut pending = stream::iter(texts.iter().enumerate())
            .map(|(idx, text)| async move { (idx, self.embed_text(text).await) })
            .buffer_unordered(concurrency);

        let mut completed = 0usize;
        let mut degraded = 0usize;
        while let Some((idx, result)) = pending.next().await {
            let embedding = match result {
                Ok(vector) => ChunkEmbedding {
                    vector,
                    degraded: false,
                },
                Err(e) => {
                    warn!(chunk_id = idx, error = %e, "Chunk embedding failed, using zero vector");
                    observer.on_fallback(&EmbeddingFallback {
                        chunk_id: idx,
                        reason: e.to_string(),
                    });
                    degraded += 1;
                    ChunkEmbedding::fallback(dimension)
                }
            };
            slots[idx] = Some(embedding);
            completed += 1;
            observer.on_progress(IngestProgress { completed, total });
        }

        info!(total_embeddings = completed, degraded, "Chunk embedding completed");

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| ChunkEmbedding::fallback(dimension)))
            .collect()
    }

    /// Clear the embedding cache
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
        info!("Embedding cache cleared");
    }

    /// Get cache statistics
    pub async fn cache_stats(&self) -> CacheStats {
        let cache = self.cache.read().await;
        CacheStats {
            len: cache.len(),
            cap: cache.cap().get(),
        }
    }
}

/// Statistics for the embedding cache
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub len: usize,
    pub cap: usize,
}

/// Similarity search helper functions
pub mod similarity {
    /// Cosine similarity between two vectors. Zero-magnitude vectors score 0.
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if mag_a == 0.0 || mag_b == 0.0 {
            0.0
        } else {
            dot / (mag_a * mag_b)
        }
    }
}
