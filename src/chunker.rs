// src/chunker.rs
// Fixed-size word-count chunking for embedding and retrieval

use crate::parser::word_count;
use serde::{Deserialize, Serialize};

/// Default number of words per chunk.
pub const DEFAULT_MAX_WORDS: usize = 400;

/// A contiguous slice of the document's word sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of the chunk in the document, starting at 0.
    pub id: usize,
    /// Words of the chunk joined by single spaces.
    pub text: String,
    pub word_count: usize,
}

/// Splits text into chunks of at most `max_words` words, in order, with no
/// overlap. Every chunk except the last holds exactly `max_words` words.
///
/// Empty or whitespace-only input yields no chunks. A `max_words` of zero is
/// treated as one.
pub fn chunk_text(text: &str, max_words: usize) -> Vec<String> {
    let max_words = max_words.max(1);
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::with_capacity(max_words);

    for word in text.split_whitespace() {
        current.push(word);
        if current.len() >= max_words {
            chunks.push(current.join(" "));
            current.clear();
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

/// Word-count chunker producing numbered [`Chunk`]s.
#[derive(Debug, Clone)]
pub struct WordChunker {
    max_words: usize,
}

impl WordChunker {
    pub fn new(max_words: usize) -> Self {
        Self {
            max_words: max_words.max(1),
        }
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        chunk_text(text, self.max_words)
            .into_iter()
            .enumerate()
            .map(|(id, text)| Chunk {
                id,
                word_count: word_count(&text),
                text,
            })
            .collect()
    }
}

impl Default for WordChunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_five_words_by_two() {
        assert_eq!(chunk_text("a b c d e", 2), vec!["a b", "c d", "e"]);
    }

    #[test]
    fn test_empty_input_has_no_chunks() {
        assert!(chunk_text("", 400).is_empty());
        assert!(chunk_text("  \n\t ", 400).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("only three words", 400);
        assert_eq!(chunks, vec!["only three words"]);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_chunk() {
        let chunks = chunk_text("a b c d", 2);
        assert_eq!(chunks, vec!["a b", "c d"]);
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let chunks = chunk_text("one\n\ntwo\tthree   four", 3);
        assert_eq!(chunks, vec!["one two three", "four"]);
    }

    #[test]
    fn test_partition_and_size_bound() {
        let words: Vec<String> = (0..1037).map(|i| format!("w{}", i)).collect();
        let text = words.join("\n");

        for max_words in [1usize, 2, 7, 400, 1037, 5000] {
            let chunks = chunk_text(&text, max_words);

            let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split(' ')).collect();
            let original: Vec<&str> = words.iter().map(String::as_str).collect();
            assert_eq!(rejoined, original, "max_words = {}", max_words);

            let (last, rest) = chunks.split_last().unwrap();
            assert!(rest.iter().all(|c| c.split(' ').count() == max_words));
            let last_len = last.split(' ').count();
            assert!(last_len >= 1 && last_len <= max_words);
        }
    }

    #[test]
    fn test_zero_max_words_treated_as_one() {
        assert_eq!(chunk_text("a b", 0), vec!["a", "b"]);
    }

    #[test]
    fn test_word_chunker_numbers_chunks() {
        let chunker = WordChunker::new(2);
        let chunks = chunker.chunk("a b c d e");

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].id, 0);
        assert_eq!(chunks[2].id, 2);
        assert_eq!(chunks[1].text, "c d");
        assert_eq!(chunks[1].word_count, 2);
        assert_eq!(chunks[2].word_count, 1);
    }

    #[test]
    fn test_default_chunker() {
        assert_eq!(WordChunker::default().max_words(), DEFAULT_MAX_WORDS);
    }
}
