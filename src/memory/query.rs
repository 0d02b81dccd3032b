// src/memory/query.rs
// RAG pipeline: ingestion (extract -> chunk -> embed -> index) and
// question answering (embed -> retrieve -> prompt with memory -> generate)

use crate::chunker::{WordChunker, DEFAULT_MAX_WORDS};
use crate::config::AppConfig;
use crate::embedder::EmbeddingService;
use crate::errors::{RagError, Result};
use crate::memory::embedding_provider::create_embedding_provider;
use crate::memory::llm_provider::{create_llm_provider, LLMProvider};
use crate::memory::session::{ConversationTurn, SessionMemory};
use crate::memory::vector_store::{IndexEntry, SearchResult, VectorIndex};
use crate::pdf::{PdfTextExtractor, TextExtractor};
use crate::progress::IngestObserver;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const PROMPT_PREAMBLE: &str =
    "You are an assistant answering based only on the PDF context and conversation history.";

/// Configuration for RAG pipeline
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub top_k: usize,
    pub max_words: usize,
    /// Prior turns included in each prompt; 0 keeps the whole conversation
    pub history_turns: usize,
    /// Skip chunks whose embedding fell back to the zero vector
    pub exclude_degraded: bool,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_words: DEFAULT_MAX_WORDS,
            history_turns: 10,
            exclude_degraded: false,
        }
    }
}

/// A document that has been chunked, embedded and indexed.
#[derive(Debug)]
pub struct IngestedDocument {
    pub index: VectorIndex,
    pub chunk_count: usize,
    pub word_count: usize,
    /// Ids of chunks stored with the zero-vector fallback
    pub degraded_chunks: Vec<usize>,
    /// Snapshot written to the index's temporary storage, if it succeeded
    pub snapshot_path: Option<PathBuf>,
}

/// Renders answered turns as `User:` / `Assistant:` line pairs.
pub fn render_history(turns: &[&ConversationTurn]) -> String {
    let mut history = String::new();
    for turn in turns {
        if let Some(answer) = turn.answer() {
            history.push_str(&format!("User: {}\nAssistant: {}\n", turn.question, answer));
        }
    }
    history
}

/// Preamble, history, context and question, always in that order.
pub fn build_prompt(history: &str, context: &str, question: &str) -> String {
    format!(
        "{}\n\nConversation history:\n{}\n\nContext from PDF:\n{}\n\nCurrent Question: {}\nAnswer:",
        PROMPT_PREAMBLE, history, context, question
    )
}

/// RAG Query Pipeline
pub struct RagPipeline {
    extractor: Arc<dyn TextExtractor>,
    embeddings: Arc<EmbeddingService>,
    llm_provider: Arc<dyn LLMProvider>,
    chunker: WordChunker,
    config: RagConfig,
}

impl RagPipeline {
    /// Create a new RAG pipeline from its collaborators
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        embeddings: Arc<EmbeddingService>,
        llm_provider: Arc<dyn LLMProvider>,
        config: RagConfig,
    ) -> Self {
        info!(
            llm_model = llm_provider.model_name(),
            embedding_model = embeddings.model_name(),
            top_k = config.top_k,
            max_words = config.max_words,
            history_turns = config.history_turns,
            "Initializing RAG pipeline"
        );
        Self {
            extractor,
            embeddings,
            llm_provider,
            chunker: WordChunker::new(config.max_words),
            config,
        }
    }

    /// Build the PDF extractor and the configured providers
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let provider =
            create_embedding_provider(&config.embedding, config.dimension, config.http_timeout)
                .map_err(|e| RagError::ProviderSetup(e.to_string()))?;
        let embeddings = Arc::new(EmbeddingService::new(provider, config.embedding_config()));

        let llm = create_llm_provider(config.llm.clone(), config.http_timeout)
            .await
            .map_err(|e| RagError::ProviderSetup(e.to_string()))?;

        Ok(Self::new(
            Arc::new(PdfTextExtractor::new()),
            embeddings,
            Arc::from(llm),
            config.rag_config(),
        ))
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Extract, chunk, embed and index a PDF
    pub async fn ingest(&self, bytes: &[u8], observer: &dyn IngestObserver) -> Result<IngestedDocument> {
        info!(size_bytes = bytes.len(), "Starting ingestion");
        let text = self.extractor.extract(bytes)?;
        self.ingest_text(&text, observer).await
    }

    /// Chunk, embed and index already-extracted text
    pub async fn ingest_text(
        &self,
        text: &str,
        observer: &dyn IngestObserver,
    ) -> Result<IngestedDocument> {
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            warn!("No readable text found, aborting ingestion");
            return Err(RagError::NoContent);
        }
        let word_count: usize = chunks.iter().map(|c| c.word_count).sum();
        debug!(chunks = chunks.len(), word_count, "Document chunked");

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embeddings.embed_chunks(&texts, observer).await;

        let mut index = VectorIndex::ephemeral(self.embeddings.dimension())?;
        let mut degraded_chunks = Vec::new();
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            if embedding.degraded {
                degraded_chunks.push(chunk.id);
            }
            index.put_entry(IndexEntry {
                id: chunk.id.to_string(),
                text: chunk.text,
                embedding: embedding.vector,
                degraded: embedding.degraded,
            })?;
        }

        let snapshot_path = match index.persist() {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "Failed to snapshot index, continuing in memory");
                None
            }
        };

        info!(
            chunks = index.len(),
            word_count,
            degraded = degraded_chunks.len(),
            "Ingestion completed"
        );

        Ok(IngestedDocument {
            chunk_count: index.len(),
            index,
            word_count,
            degraded_chunks,
            snapshot_path,
        })
    }

    /// Embed the question and fetch the top-k chunks
    pub async fn retrieve(&self, index: &VectorIndex, question: &str) -> Result<Vec<SearchResult>> {
        let query_embedding = self
            .embeddings
            .embed_query(question)
            .await
            .map_err(RagError::QueryEmbeddingFailed)?;

        let results =
            index.query_filtered(&query_embedding, self.config.top_k, self.config.exclude_degraded)?;
        debug!(results = results.len(), "Retrieved context chunks");
        Ok(results)
    }

    /// Answer one question. Failures become a failed turn rather than an error.
    pub async fn answer(
        &self,
        index: &VectorIndex,
        memory: &SessionMemory,
        question: &str,
    ) -> ConversationTurn {
        info!(question_len = question.len(), history = memory.len(), "Answering question");

        match self.try_answer(index, memory, question).await {
            Ok(answer) => ConversationTurn::answered(question, answer),
            Err(e) => {
                warn!(error = %e, "Question failed");
                ConversationTurn::failed(question, &e)
            }
        }
    }

    async fn try_answer(
        &self,
        index: &VectorIndex,
        memory: &SessionMemory,
        question: &str,
    ) -> Result<String> {
        let results = self.retrieve(index, question).await?;
        let context = results
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let history = render_history(&memory.prompt_history(self.config.history_turns));
        let prompt = build_prompt(&history, &context, question);
        debug!(prompt_len = prompt.len(), context_chunks = results.len(), "Prompt assembled");

        self.llm_provider
            .generate(&prompt)
            .await
            .map_err(RagError::GenerationUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_config_default() {
        let config = RagConfig::default();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.max_words, 400);
        assert_eq!(config.history_turns, 10);
        assert!(!config.exclude_degraded);
    }

    #[test]
    fn test_build_prompt_layout() {
        let prompt = build_prompt("User: hi\nAssistant: hello\n", "ctx one\nctx two", "What?");
        assert_eq!(
            prompt,
            "You are an assistant answering based only on the PDF context and conversation history.\n\n\
             Conversation history:\nUser: hi\nAssistant: hello\n\n\n\
             Context from PDF:\nctx one\nctx two\n\n\
             Current Question: What?\nAnswer:"
        );
    }

    #[test]
    fn test_build_prompt_with_empty_blocks() {
        let prompt = build_prompt("", "", "Anything?");
        assert!(prompt.contains("Conversation history:\n\n\nContext from PDF:\n\n\nCurrent Question: Anything?"));
    }

    #[test]
    fn test_render_history_in_order() {
        let first = ConversationTurn::answered("q1", "a1");
        let second = ConversationTurn::answered("q2", "a2");
        let history = render_history(&[&first, &second]);
        assert_eq!(history, "User: q1\nAssistant: a1\nUser: q2\nAssistant: a2\n");
    }

    #[test]
    fn test_render_history_skips_failures() {
        let ok = ConversationTurn::answered("q1", "a1");
        let failed = ConversationTurn::failed("q2", &RagError::NoContent);
        assert_eq!(render_history(&[&ok, &failed]), "User: q1\nAssistant: a1\n");
    }
}
