pub mod chunker;
pub mod cli;
pub mod config;
pub mod embedder;
pub mod errors;
pub mod memory; // The folder
pub mod monitoring;
pub mod parser;
pub mod pdf;
pub mod progress;

pub use config::AppConfig;
pub use errors::{RagError, Result};
pub use memory::{RagPipeline, Session};
