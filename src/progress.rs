// src/progress.rs
// Ingestion progress reporting

/// Snapshot of ingestion progress, emitted after each chunk is embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestProgress {
    pub completed: usize,
    pub total: usize,
}

impl IngestProgress {
    /// Proportion of chunks embedded so far, in `0.0..=1.0`.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f32 / self.total as f32
        }
    }
}

/// A chunk whose embedding failed and was replaced by the zero vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingFallback {
    pub chunk_id: usize,
    pub reason: String,
}

/// Receives ingestion events. Both methods default to no-ops.
pub trait IngestObserver: Send + Sync {
    fn on_progress(&self, _progress: IngestProgress) {}
    fn on_fallback(&self, _fallback: &EmbeddingFallback) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl IngestObserver for NoopObserver {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction() {
        let p = IngestProgress {
            completed: 1,
            total: 4,
        };
        assert!((p.fraction() - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fraction_of_nothing_is_complete() {
        let p = IngestProgress {
            completed: 0,
            total: 0,
        };
        assert_eq!(p.fraction(), 1.0);
    }
}
