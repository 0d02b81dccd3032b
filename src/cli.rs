// src/cli.rs
// Interactive terminal session: upload a PDF, then chat about it

use crate::errors::{RagError, Result};
use crate::memory::query::RagPipeline;
use crate::memory::session::{ConversationTurn, Session, TurnOutcome};
use crate::progress::{EmbeddingFallback, IngestObserver, IngestProgress};
use colored::Colorize;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const HELP: &str = "Commands: /history shows the conversation, /new loads another PDF, /quit exits.";

/// Ingestion observer that drives an indicatif progress bar.
pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template(
            "{spinner:.green} Embedding chunks [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
        Self::with_bar(ProgressBar::new(0).with_style(style))
    }

    /// Draws nothing; used when output is not a terminal and in tests
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self { bar }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestObserver for ProgressObserver {
    fn on_progress(&self, progress: IngestProgress) {
        self.bar.set_length(progress.total as u64);
        self.bar.set_position(progress.completed as u64);
    }

    fn on_fallback(&self, fallback: &EmbeddingFallback) {
        self.bar.println(format!(
            "{} chunk {} could not be embedded ({}); it was stored with a zero vector",
            "warning:".yellow().bold(),
            fallback.chunk_id,
            fallback.reason
        ));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    History,
    NewDocument,
    Help,
    Empty,
    Ask(String),
}

pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    match input.to_lowercase().as_str() {
        "" => Command::Empty,
        "/quit" | "/exit" => Command::Quit,
        "/history" => Command::History,
        "/new" => Command::NewDocument,
        "/help" => Command::Help,
        _ => Command::Ask(input.to_string()),
    }
}

/// Only `.pdf` files (any case) are accepted for upload
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn print_answer(turn: &ConversationTurn) {
    match &turn.outcome {
        TurnOutcome::Answered(answer) => println!("{} {}", "Assistant:".green().bold(), answer),
        TurnOutcome::Failed { message, .. } => {
            println!("{} {}", "Assistant:".green().bold(), message.red())
        }
    }
}

pub fn print_turn(turn: &ConversationTurn) {
    println!("{} {}", "You:".cyan().bold(), turn.question);
    print_answer(turn);
}

pub fn print_transcript(session: &Session) {
    if session.memory().is_empty() {
        println!("{}", "No questions asked yet.".dimmed());
        return;
    }
    for turn in session.memory().turns() {
        print_turn(turn);
        println!();
    }
}

fn print_error(err: &RagError) {
    eprintln!("{} {}", "error:".red().bold(), err);
    eprintln!("{}", err.recovery_hint().dimmed());
}

enum ChatExit {
    Quit,
    NewDocument,
}

/// Runs upload and chat until the user quits or input ends.
pub async fn run(pipeline: &RagPipeline, initial: Option<PathBuf>) {
    let mut next_path = initial;

    loop {
        let path = match next_path.take() {
            Some(path) => path,
            None => match prompt_for_path() {
                Some(path) => path,
                None => return,
            },
        };

        // A new upload always gets a fresh session; the previous index is dropped here
        let mut session = Session::new();
        if let Err(e) = ingest_file(pipeline, &mut session, &path).await {
            print_error(&e);
            continue;
        }

        match chat(pipeline, &mut session).await {
            ChatExit::Quit => return,
            ChatExit::NewDocument => continue,
        }
    }
}

fn prompt_for_path() -> Option<PathBuf> {
    let answer: String = match Input::new().with_prompt("Path to a PDF").interact_text() {
        Ok(answer) => answer,
        Err(e) => {
            warn!(error = %e, "Input closed");
            return None;
        }
    };
    match parse_command(&answer) {
        Command::Quit => None,
        _ => Some(PathBuf::from(answer.trim())),
    }
}

async fn ingest_file(pipeline: &RagPipeline, session: &mut Session, path: &Path) -> Result<()> {
    if !is_pdf_path(path) {
        return Err(RagError::DocumentUnreadable(format!(
            "{} is not a PDF file",
            path.display()
        )));
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| RagError::DocumentUnreadable(format!("{}: {}", path.display(), e)))?;
    info!(path = %path.display(), size_bytes = bytes.len(), "Read upload");

    println!("{} {}", "Processing".bold(), path.display());
    let observer = ProgressObserver::new();
    let result = session.ingest(pipeline, &bytes, &observer).await;
    observer.finish();
    let document = result?;

    println!(
        "{} {} chunks ({} words) indexed. Ask away!",
        "Ready:".green().bold(),
        document.chunk_count,
        document.word_count
    );
    if !document.degraded_chunks.is_empty() {
        println!(
            "{} {} of {} chunks have no embedding and will rarely be retrieved.",
            "note:".yellow().bold(),
            document.degraded_chunks.len(),
            document.chunk_count
        );
    }
    println!("{}", HELP.dimmed());
    Ok(())
}

async fn chat(pipeline: &RagPipeline, session: &mut Session) -> ChatExit {
    loop {
        let line: String = match Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Input closed");
                return ChatExit::Quit;
            }
        };

        let question = match parse_command(&line) {
            Command::Quit => return ChatExit::Quit,
            Command::NewDocument => return ChatExit::NewDocument,
            Command::History => {
                print_transcript(session);
                continue;
            }
            Command::Help => {
                println!("{}", HELP);
                continue;
            }
            Command::Empty => continue,
            Command::Ask(question) => question,
        };

        let spinner = ProgressBar::new_spinner();
        spinner.set_message("Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        let result = session.ask(pipeline, &question).await;
        spinner.finish_and_clear();

        match result {
            Ok(turn) => print_answer(turn),
            Err(e) => print_error(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::{EmbeddingConfig, EmbeddingService, HashEmbedder};
    use crate::memory::llm_provider::OllamaProvider;
    use crate::memory::query::RagConfig;
    use crate::memory::session::SessionState;
    use crate::pdf::PdfTextExtractor;
    use std::sync::Arc;

    fn offline_pipeline() -> RagPipeline {
        let embeddings = EmbeddingService::new(
            Arc::new(HashEmbedder::new(16)),
            EmbeddingConfig::default(),
        );
        let llm = OllamaProvider::new(
            "http://127.0.0.1:9".to_string(),
            "phi:latest".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        RagPipeline::new(
            Arc::new(PdfTextExtractor::new()),
            Arc::new(embeddings),
            Arc::new(llm),
            RagConfig::default(),
        )
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("/quit"), Command::Quit);
        assert_eq!(parse_command(" /EXIT "), Command::Quit);
        assert_eq!(parse_command("/history"), Command::History);
        assert_eq!(parse_command("/new"), Command::NewDocument);
        assert_eq!(parse_command("/help"), Command::Help);
        assert_eq!(parse_command("   "), Command::Empty);
        assert_eq!(
            parse_command("  What is chapter 2 about? "),
            Command::Ask("What is chapter 2 about?".to_string())
        );
    }

    #[test]
    fn test_is_pdf_path() {
        assert!(is_pdf_path(Path::new("report.pdf")));
        assert!(is_pdf_path(Path::new("/tmp/Scan.PDF")));
        assert!(!is_pdf_path(Path::new("notes.txt")));
        assert!(!is_pdf_path(Path::new("pdf")));
    }

    #[test]
    fn test_progress_observer_tracks_counts() {
        let observer = ProgressObserver::hidden();
        observer.on_progress(IngestProgress {
            completed: 2,
            total: 5,
        });
        assert_eq!(observer.position(), 2);
        assert_eq!(observer.length(), Some(5));

        observer.on_fallback(&EmbeddingFallback {
            chunk_id: 1,
            reason: "timeout".to_string(),
        });
        observer.finish();
    }

    #[tokio::test]
    async fn test_non_pdf_is_rejected_before_reading() {
        let pipeline = offline_pipeline();
        let mut session = Session::new();
        let err = ingest_file(&pipeline, &mut session, Path::new("/does/not/exist.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DocumentUnreadable(ref m) if m.contains("not a PDF")));
        assert_eq!(session.state(), SessionState::Empty);
    }

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let pipeline = offline_pipeline();
        let mut session = Session::new();
        let dir = tempfile::tempdir().unwrap();
        let err = ingest_file(&pipeline, &mut session, &dir.path().join("missing.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DocumentUnreadable(_)));
    }
}
