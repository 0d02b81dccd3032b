// src/pdf/extractor.rs
// PDF text extraction behind a swappable trait

use crate::parser::clean_text;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Document unreadable: {0}")]
    DocumentUnreadable(String),
}

/// Converts an uploaded document into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Joins page texts in order. Each page with non-blank text is cleaned and
/// followed by a newline; blank pages contribute nothing.
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut text = String::new();
    for page in pages {
        let cleaned = clean_text(page.as_ref());
        if cleaned.is_empty() {
            continue;
        }
        text.push_str(&cleaned);
        text.push('\n');
    }
    text
}

/// Extractor backed by the `pdf-extract` crate.
#[derive(Debug, Default, Clone)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        debug!(size_bytes = bytes.len(), "Extracting PDF text");

        // pdf-extract panics on some malformed inputs
        let pages_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }));

        let pages = match pages_result {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => {
                warn!(error = %e, "PDF parsing failed");
                return Err(ExtractError::DocumentUnreadable(e.to_string()));
            }
            Err(panic_payload) => {
                let panic_msg = if let Some(s) = panic_payload.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic in PDF parser".to_string()
                };
                warn!(error = %panic_msg, "PDF parser panicked");
                return Err(ExtractError::DocumentUnreadable(panic_msg));
            }
        };

        let total_pages = pages.len();
        let text = join_pages(&pages);
        info!(pages = total_pages, chars = text.len(), "PDF text extracted");
        Ok(text)
    }
}
