// src/memory/mod.rs

pub mod embedding_provider;
pub mod llm_provider;
pub mod persistence;
pub mod query;
pub mod session;
pub mod vector_store;

pub use embedding_provider::{create_embedding_provider, EmbeddingBackend, GeminiEmbedder, OllamaEmbedder};
pub use llm_provider::{create_llm_provider, GeminiProvider, LLMConfig, LLMError, LLMProvider, OllamaProvider};
pub use persistence::{load_snapshot, save_snapshot, IndexSnapshot, PersistenceError};
pub use query::{build_prompt, render_history, IngestedDocument, RagConfig, RagPipeline};
pub use session::{ConversationTurn, FailureKind, Session, SessionMemory, SessionState, TurnOutcome};
pub use vector_store::{IndexEntry, IndexError, SearchResult, VectorIndex};
