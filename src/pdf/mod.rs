// src/pdf/mod.rs

pub mod extractor;

pub use extractor::{join_pages, ExtractError, PdfTextExtractor, TextExtractor};
