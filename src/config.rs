// src/config.rs
// Application configuration from environment variables (.env supported)

use crate::chunker::DEFAULT_MAX_WORDS;
use crate::embedder::{EmbeddingConfig, DEFAULT_DIMENSION};
use crate::memory::embedding_provider::{EmbeddingBackend, GEMINI_BASE_URL};
use crate::memory::llm_provider::LLMConfig;
use crate::memory::query::RagConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub embedding: EmbeddingBackend,
    pub llm: LLMConfig,
    pub dimension: usize,
    pub max_words: usize,
    pub top_k: usize,
    /// Prior turns included in each prompt; 0 keeps the whole conversation
    pub history_turns: usize,
    pub embed_concurrency: usize,
    pub embed_cache_size: usize,
    pub exclude_degraded: bool,
    pub http_timeout: Duration,
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup, e.g. a map in tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gemini_base = get("GEMINI_BASE_URL").unwrap_or_else(|| GEMINI_BASE_URL.to_string());
        let ollama_url = get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        let gemini_key = get("GEMINI_API_KEY");

        let embedding = match get("EMBEDDING_PROVIDER")
            .unwrap_or_else(|| "gemini".to_string())
            .to_lowercase()
            .as_str()
        {
            "gemini" => EmbeddingBackend::Gemini {
                base_url: gemini_base.clone(),
                api_key: gemini_key.clone().ok_or(ConfigError::Missing("GEMINI_API_KEY"))?,
                model: get("GEMINI_EMBEDDING_MODEL").unwrap_or_else(|| "embedding-001".to_string()),
            },
            "ollama" => EmbeddingBackend::Ollama {
                ollama_url: ollama_url.clone(),
                model: get("OLLAMA_EMBEDDING_MODEL")
                    .unwrap_or_else(|| "nomic-embed-text".to_string()),
            },
            "hash" => EmbeddingBackend::Hash,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "EMBEDDING_PROVIDER",
                    value: other.to_string(),
                })
            }
        };

        let llm = match get("LLM_PROVIDER")
            .unwrap_or_else(|| "gemini".to_string())
            .to_lowercase()
            .as_str()
        {
            "gemini" => LLMConfig::Gemini {
                base_url: gemini_base,
                api_key: gemini_key.ok_or(ConfigError::Missing("GEMINI_API_KEY"))?,
                model: get("GEMINI_GENERATION_MODEL")
                    .unwrap_or_else(|| "gemini-2.0-flash".to_string()),
            },
            "ollama" => LLMConfig::Ollama {
                ollama_url,
                model: get("OLLAMA_MODEL").unwrap_or_else(|| "phi:latest".to_string()),
            },
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "LLM_PROVIDER",
                    value: other.to_string(),
                })
            }
        };

        let config = Self {
            embedding,
            llm,
            dimension: parse_or(&get, "EMBEDDING_DIMENSION", DEFAULT_DIMENSION)?,
            max_words: parse_or(&get, "CHUNK_MAX_WORDS", DEFAULT_MAX_WORDS)?,
            top_k: parse_or(&get, "RAG_TOP_K", 3)?,
            history_turns: parse_or(&get, "HISTORY_TURNS", 10)?,
            embed_concurrency: parse_or(&get, "EMBED_CONCURRENCY", 4)?,
            embed_cache_size: parse_or(&get, "EMBED_CACHE_SIZE", 10_000)?,
            exclude_degraded: parse_or(&get, "EXCLUDE_DEGRADED_CHUNKS", false)?,
            http_timeout: Duration::from_secs(parse_or(&get, "HTTP_TIMEOUT_SECS", 60u64)?),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("EMBEDDING_DIMENSION", self.dimension),
            ("CHUNK_MAX_WORDS", self.max_words),
            ("RAG_TOP_K", self.top_k),
            ("EMBED_CONCURRENCY", self.embed_concurrency),
            ("EMBED_CACHE_SIZE", self.embed_cache_size),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::Zero(key));
            }
        }
        if self.http_timeout.is_zero() {
            return Err(ConfigError::Zero("HTTP_TIMEOUT_SECS"));
        }
        Ok(())
    }

    pub fn rag_config(&self) -> RagConfig {
        RagConfig {
            top_k: self.top_k,
            max_words: self.max_words,
            history_turns: self.history_turns,
            exclude_degraded: self.exclude_degraded,
        }
    }

    pub fn embedding_config(&self) -> EmbeddingConfig {
        EmbeddingConfig {
            concurrency: self.embed_concurrency,
            cache_size: self.embed_cache_size,
        }
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw,
        }),
        None => Ok(default),
    }
}
