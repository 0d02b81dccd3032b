// src/memory/session.rs
// One user session: the ingested document, its index and the conversation log

use crate::errors::{RagError, Result};
use crate::memory::query::{IngestedDocument, RagPipeline};
use crate::progress::IngestObserver;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;
use uuid::Uuid;

/// Which step of answering a question failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    QueryEmbedding,
    Retrieval,
    Generation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnOutcome {
    Answered(String),
    /// Shown to the user, never fed back into a prompt
    Failed { kind: FailureKind, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub outcome: TurnOutcome,
    pub asked_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn answered(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            outcome: TurnOutcome::Answered(answer.into()),
            asked_at: Utc::now(),
        }
    }

    pub fn failed(question: impl Into<String>, err: &RagError) -> Self {
        Self {
            question: question.into(),
            outcome: TurnOutcome::Failed {
                kind: err.failure_kind(),
                message: err.to_string(),
            },
            asked_at: Utc::now(),
        }
    }

    /// The generated answer, if the question succeeded
    pub fn answer(&self) -> Option<&str> {
        match &self.outcome {
            TurnOutcome::Answered(text) => Some(text),
            TurnOutcome::Failed { .. } => None,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.answer().is_some()
    }

    /// Text to show in the transcript: the answer or the error message
    pub fn display_answer(&self) -> &str {
        match &self.outcome {
            TurnOutcome::Answered(text) => text,
            TurnOutcome::Failed { message, .. } => message,
        }
    }
}

/// Append-only, chronologically ordered conversation log.
#[derive(Debug, Clone, Default)]
pub struct SessionMemory {
    turns: Vec<ConversationTurn>,
}

impl SessionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// The last `limit` answered turns, oldest first. A limit of 0 means all.
    pub fn prompt_history(&self, limit: usize) -> Vec<&ConversationTurn> {
        let answered: Vec<&ConversationTurn> =
            self.turns.iter().filter(|t| t.is_answered()).collect();
        if limit == 0 || answered.len() <= limit {
            return answered;
        }
        answered[answered.len() - limit..].to_vec()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Ingesting,
    Ready,
    Answering,
    /// Ingestion failed; a new session is needed
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Empty => "empty",
            SessionState::Ingesting => "ingesting",
            SessionState::Ready => "ready",
            SessionState::Answering => "answering",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Owns everything scoped to one uploaded document. Dropping the session
/// drops its index, temporary storage and memory.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    state: SessionState,
    document: Option<IngestedDocument>,
    memory: SessionMemory,
}

impl Session {
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        info!(session_id = %id, "Session created");
        Self {
            id,
            created_at: Utc::now(),
            state: SessionState::Empty,
            document: None,
            memory: SessionMemory::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn document(&self) -> Option<&IngestedDocument> {
        self.document.as_ref()
    }

    pub fn memory(&self) -> &SessionMemory {
        &self.memory
    }

    /// Build this session's index from PDF bytes. Allowed once, from `Empty`.
    pub async fn ingest(
        &mut self,
        pipeline: &RagPipeline,
        bytes: &[u8],
        observer: &dyn IngestObserver,
    ) -> Result<&IngestedDocument> {
        self.expect_state(SessionState::Empty)?;
        self.state = SessionState::Ingesting;

        match pipeline.ingest(bytes, observer).await {
            Ok(document) => self.finish_ingest(document),
            Err(e) => {
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Same as [`ingest`](Self::ingest) for text that is already extracted.
    pub async fn ingest_text(
        &mut self,
        pipeline: &RagPipeline,
        text: &str,
        observer: &dyn IngestObserver,
    ) -> Result<&IngestedDocument> {
        self.expect_state(SessionState::Empty)?;
        self.state = SessionState::Ingesting;

        match pipeline.ingest_text(text, observer).await {
            Ok(document) => self.finish_ingest(document),
            Err(e) => {
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Answer a question and record the turn, successful or not.
    pub async fn ask(&mut self, pipeline: &RagPipeline, question: &str) -> Result<&ConversationTurn> {
        self.expect_state(SessionState::Ready)?;
        let document = self
            .document
            .as_ref()
            .ok_or(RagError::InvalidState(SessionState::Empty, SessionState::Ready))?;

        self.state = SessionState::Answering;
        let turn = pipeline.answer(&document.index, &self.memory, question).await;
        self.memory.append(turn);
        self.state = SessionState::Ready;

        info!(session_id = %self.id, turns = self.memory.len(), "Turn recorded");
        self.memory
            .last()
            .ok_or(RagError::InvalidState(SessionState::Empty, SessionState::Ready))
    }

    fn finish_ingest(&mut self, document: IngestedDocument) -> Result<&IngestedDocument> {
        info!(
            session_id = %self.id,
            chunks = document.chunk_count,
            degraded = document.degraded_chunks.len(),
            "Session ready"
        );
        self.state = SessionState::Ready;
        let document = self.document.insert(document);
        Ok(&*document)
    }

    fn expect_state(&self, expected: SessionState) -> Result<()> {
        if self.state != expected {
            return Err(RagError::InvalidState(self.state, expected));
        }
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
