//! VectorStore trait: the storage seam of the retrieval pipeline.
//!
//! The shipped backend is [`SqliteVectorStore`](super::sqlite::SqliteVectorStore).

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::errors::ApiError;

pub type Metadata = Map<String, Value>;

/// A chunk ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub source: String,
    pub content: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

/// A chunk as read back, without its vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredChunk {
    pub chunk_id: String,
    pub source: String,
    pub content: String,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMatch {
    pub text: String,
    pub metadata: Metadata,
    /// `1 - cosine_similarity`; lower is closer.
    pub distance: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace records by chunk id.
    async fn upsert(&self, records: Vec<ChunkRecord>) -> Result<(), ApiError>;

    /// Nearest `k` chunks by cosine distance, ascending. `sources`, when
    /// non-empty, restricts the search to those documents. Stored vectors of
    /// a different dimension are not candidates.
    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        sources: Option<&[String]>,
    ) -> Result<Vec<SearchMatch>, ApiError>;

    async fn get_all(&self, sources: Option<&[String]>) -> Result<Vec<StoredChunk>, ApiError>;

    /// Returns the number of rows removed.
    async fn delete_by_ids(&self, ids: &[String]) -> Result<usize, ApiError>;

    async fn count(&self) -> Result<usize, ApiError>;
}

pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        1.0
    } else {
        1.0 - dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_bounds() {
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_or_zero_vectors_are_maximally_unrelated() {
        assert_eq!(cosine_distance(&[1.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_distance(&[], &[]), 1.0);
    }
}
