// src/memory/vector_store.rs
// Session-scoped vector index: write-once upserts, cosine top-k queries

use crate::embedder::similarity::cosine_similarity;
use crate::embedder::EmbeddingVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

/// One stored chunk: its id, text and embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub text: String,
    pub embedding: EmbeddingVector,
    /// Set when the embedding is the zero-vector fallback
    #[serde(default)]
    pub degraded: bool,
}

/// Search result with similarity score
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Failed to create index storage: {0}")]
    Storage(#[from] std::io::Error),
}

/// In-memory vector index, optionally backed by a temporary directory that is
/// removed when the index is dropped.
#[derive(Debug)]
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
    index_map: HashMap<String, usize>,
    storage: Option<TempDir>,
}

impl VectorIndex {
    /// Create an index with no backing storage
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
            index_map: HashMap::new(),
            storage: None,
        }
    }

    /// Create an index with a fresh temporary storage directory
    pub fn ephemeral(dimension: usize) -> Result<Self, IndexError> {
        let storage = tempfile::Builder::new().prefix("docqa-index-").tempdir()?;
        info!(path = ?storage.path(), dimension, "Created ephemeral index storage");
        Ok(Self {
            storage: Some(storage),
            ..Self::new(dimension)
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.index_map.get(id).map(|idx| &self.entries[*idx])
    }

    /// Temporary storage directory, if any
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage.as_ref().map(|dir| dir.path())
    }

    /// Upsert a chunk keyed by `id`.
    pub fn put(
        &mut self,
        id: impl Into<String>,
        text: impl Into<String>,
        embedding: EmbeddingVector,
    ) -> Result<(), IndexError> {
        self.put_entry(IndexEntry {
            id: id.into(),
            text: text.into(),
            embedding,
            degraded: false,
        })
    }

    /// Upsert a full entry keyed by its id.
    pub fn put_entry(&mut self, entry: IndexEntry) -> Result<(), IndexError> {
        self.check_dimension(entry.embedding.len())?;

        if let Some(idx) = self.index_map.get(&entry.id) {
            debug!(id = %entry.id, "Updating existing entry");
            self.entries[*idx] = entry;
            return Ok(());
        }

        debug!(id = %entry.id, degraded = entry.degraded, "Adding entry");
        self.index_map.insert(entry.id.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Up to `k` entries ranked by cosine similarity, most similar first.
    /// Equal scores keep insertion order.
    pub fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchResult>, IndexError> {
        self.query_filtered(embedding, k, false)
    }

    /// Like [`query`](Self::query), optionally skipping fallback entries.
    pub fn query_filtered(
        &self,
        embedding: &[f32],
        k: usize,
        exclude_degraded: bool,
    ) -> Result<Vec<SearchResult>, IndexError> {
        self.check_dimension(embedding.len())?;

        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .filter(|entry| !(exclude_degraded && entry.degraded))
            .map(|entry| SearchResult {
                id: entry.id.clone(),
                text: entry.text.clone(),
                score: cosine_similarity(embedding, &entry.embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);

        debug!(results_count = results.len(), top_k = k, "Index query returned results");
        Ok(results)
    }

    fn check_dimension(&self, actual: usize) -> Result<(), IndexError> {
        if actual != self.dimension {
            return Err(IndexError::InvalidDimension {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(vectors: &[(&str, Vec<f32>)]) -> VectorIndex {
        let mut index = VectorIndex::new(3);
        for (id, v) in vectors {
            index.put(*id, format!("text {}", id), v.clone()).unwrap();
        }
        index
    }

    #[test]
    fn test_query_ranks_by_similarity() {
        let index = index_with(&[
            ("0", vec![0.0, 1.0, 0.0]),
            ("1", vec![1.0, 0.0, 0.0]),
            ("2", vec![0.9, 0.1, 0.0]),
        ]);

        let results = index.query(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "1");
        assert_eq!(results[1].id, "2");
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_query_bounds() {
        let index = index_with(&[("0", vec![1.0, 0.0, 0.0]), ("1", vec![0.0, 1.0, 0.0])]);

        assert_eq!(index.query(&[1.0, 0.0, 0.0], 3).unwrap().len(), 2);
        assert_eq!(index.query(&[1.0, 0.0, 0.0], 1).unwrap().len(), 1);
        assert!(index.query(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = VectorIndex::new(3);
        assert!(index.is_empty());
        assert!(index.query(&[1.0, 0.0, 0.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = index_with(&[
            ("0", vec![0.0, 0.0, 0.0]),
            ("1", vec![0.0, 0.0, 0.0]),
            ("2", vec![0.0, 0.0, 0.0]),
        ]);
        let ids: Vec<String> = index
            .query(&[1.0, 0.0, 0.0], 3)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_put_is_upsert() {
        let mut index = VectorIndex::new(3);
        index.put("0", "first", vec![1.0, 0.0, 0.0]).unwrap();
        index.put("0", "second", vec![0.0, 1.0, 0.0]).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("0").unwrap().text, "second");
    }

    #[test]
    fn test_dimension_is_enforced() {
        let mut index = VectorIndex::new(3);
        assert!(matches!(
            index.put("0", "x", vec![1.0]),
            Err(IndexError::InvalidDimension {
                expected: 3,
                actual: 1
            })
        ));
        assert!(index.query(&[1.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_exclude_degraded() {
        let mut index = index_with(&[("0", vec![1.0, 0.0, 0.0])]);
        index
            .put_entry(IndexEntry {
                id: "1".to_string(),
                text: "fallback".to_string(),
                embedding: vec![0.0, 0.0, 0.0],
                degraded: true,
            })
            .unwrap();

        assert_eq!(index.query_filtered(&[0.0, 1.0, 0.0], 5, false).unwrap().len(), 2);
        let filtered = index.query_filtered(&[0.0, 1.0, 0.0], 5, true).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "0");
    }

    #[test]
    fn test_ephemeral_storage_removed_on_drop() {
        let index = VectorIndex::ephemeral(3).unwrap();
        let path = index.storage_path().unwrap().to_path_buf();
        assert!(path.exists());
        drop(index);
        assert!(!path.exists());
    }
}
