// src/memory/persistence.rs
// Snapshot an index to JSON inside its ephemeral storage

use crate::memory::vector_store::{IndexEntry, IndexError, VectorIndex};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const SNAPSHOT_FILE: &str = "index.json";

/// Serializable snapshot of a vector index
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub version: u32,
    pub timestamp: i64,
    pub dimension: usize,
    pub entries: Vec<IndexEntry>,
}

impl IndexSnapshot {
    pub fn from_index(index: &VectorIndex) -> Self {
        Self {
            version: 1,
            timestamp: chrono::Utc::now().timestamp(),
            dimension: index.dimension(),
            entries: index.entries().to_vec(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index has no storage directory")]
    NoStorage,

    #[error("Invalid snapshot: {0}")]
    Index(#[from] IndexError),
}

/// Save an index snapshot to a JSON file
pub fn save_snapshot<P: AsRef<Path>>(index: &VectorIndex, path: P) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    debug!(path = ?path, "Saving index snapshot");

    let snapshot = IndexSnapshot::from_index(index);
    let json = serde_json::to_string(&snapshot)?;
    std::fs::write(path, json)?;

    info!(path = ?path, entries = snapshot.entries.len(), "Index snapshot saved");
    Ok(())
}

/// Load a snapshot into a new index without backing storage
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<VectorIndex, PersistenceError> {
    let path = path.as_ref();
    debug!(path = ?path, "Loading index snapshot");

    let json = std::fs::read_to_string(path)?;
    let snapshot: IndexSnapshot = serde_json::from_str(&json)?;

    let count = snapshot.entries.len();
    let mut index = VectorIndex::new(snapshot.dimension);
    for entry in snapshot.entries {
        index.put_entry(entry)?;
    }

    info!(path = ?path, entries = count, "Index snapshot loaded");
    Ok(index)
}

impl VectorIndex {
    /// Write a snapshot into the index's temporary storage directory.
    pub fn persist(&self) -> Result<PathBuf, PersistenceError> {
        let dir = self.storage_path().ok_or(PersistenceError::NoStorage)?;
        let path = dir.join(SNAPSHOT_FILE);
        save_snapshot(self, &path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_snapshot_preserves_entries() {
        let mut index = VectorIndex::new(2);
        index.put("0", "alpha", vec![1.0, 0.0]).unwrap();
        index
            .put_entry(IndexEntry {
                id: "1".to_string(),
                text: "beta".to_string(),
                embedding: vec![0.0, 0.0],
                degraded: true,
            })
            .unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("snap.json");
        save_snapshot(&index, &path).unwrap();

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded.dimension(), 2);
        assert_eq!(loaded.entries(), index.entries());
        assert!(loaded.storage_path().is_none());
    }

    #[test]
    fn test_persist_requires_storage() {
        let index = VectorIndex::new(2);
        assert!(matches!(index.persist(), Err(PersistenceError::NoStorage)));
    }

    #[test]
    fn test_persist_into_ephemeral_storage() {
        let mut index = VectorIndex::ephemeral(2).unwrap();
        index.put("0", "alpha", vec![1.0, 0.0]).unwrap();

        let path = index.persist().unwrap();
        assert!(path.starts_with(index.storage_path().unwrap()));
        assert_eq!(load_snapshot(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_snapshot_is_io_error() {
        let dir = tempdir().unwrap();
        let result = load_snapshot(dir.path().join("missing.json"));
        assert!(matches!(result, Err(PersistenceError::Io(_))));
    }
}
