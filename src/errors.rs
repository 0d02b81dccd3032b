// src/errors.rs
// Pipeline error taxonomy

use crate::config::ConfigError;
use crate::embedder::EmbeddingError;
use crate::memory::llm_provider::LLMError;
use crate::memory::session::{FailureKind, SessionState};
use crate::memory::vector_store::IndexError;
use crate::pdf::ExtractError;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Debug, Error)]
pub enum RagError {
    // Ingestion
    #[error("Error reading PDF: {0}")]
    DocumentUnreadable(String),

    #[error("No readable text found in the PDF")]
    NoContent,

    // Questions
    #[error("Failed to embed question: {0}")]
    QueryEmbeddingFailed(EmbeddingError),

    #[error("Generation failed: {0}")]
    GenerationUnavailable(LLMError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    // Session
    #[error("Session is {0}, expected {1}")]
    InvalidState(SessionState, SessionState),

    // Setup
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider setup failed: {0}")]
    ProviderSetup(String),
}

impl From<ExtractError> for RagError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::DocumentUnreadable(msg) => RagError::DocumentUnreadable(msg),
        }
    }
}

impl RagError {
    /// Whether the error ends ingestion of the current document
    pub fn is_ingestion_fatal(&self) -> bool {
        matches!(
            self,
            RagError::DocumentUnreadable(_) | RagError::NoContent | RagError::Index(_)
        )
    }

    /// Classification used when a question fails
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            RagError::QueryEmbeddingFailed(_) => FailureKind::QueryEmbedding,
            RagError::GenerationUnavailable(_) => FailureKind::Generation,
            _ => FailureKind::Retrieval,
        }
    }

    /// Hint shown to the user next to the error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            RagError::DocumentUnreadable(_) | RagError::NoContent => {
                "Upload a different PDF (scanned documents without a text layer cannot be read)."
            }
            RagError::QueryEmbeddingFailed(_) | RagError::GenerationUnavailable(_) => {
                "The session is still usable; try asking again."
            }
            _ => "Check the logs for more details.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_maps_to_unreadable() {
        let err: RagError = ExtractError::DocumentUnreadable("bad header".to_string()).into();
        assert!(matches!(err, RagError::DocumentUnreadable(ref m) if m == "bad header"));
        assert!(err.is_ingestion_fatal());
    }

    #[test]
    fn test_failure_kinds() {
        let q = RagError::QueryEmbeddingFailed(EmbeddingError::EmptyInput);
        let g = RagError::GenerationUnavailable(LLMError::ConnectionFailed("down".to_string()));
        assert_eq!(q.failure_kind(), FailureKind::QueryEmbedding);
        assert_eq!(g.failure_kind(), FailureKind::Generation);
        assert!(!q.is_ingestion_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = RagError::GenerationUnavailable(LLMError::ConnectionFailed("timeout".to_string()));
        assert_eq!(
            err.to_string(),
            "Generation failed: LLM connection failed: timeout"
        );
        assert_eq!(RagError::NoContent.to_string(), "No readable text found in the PDF");
    }

    #[test]
    fn test_invalid_state_display() {
        let err = RagError::InvalidState(SessionState::Empty, SessionState::Ready);
        assert_eq!(err.to_string(), "Session is empty, expected ready");
    }
}
