use async_trait::async_trait;
use uuid::Uuid;

use crate::Result;

/// A row stored in the [`VectorIndex`].
#[derive(Debug, Clone)]
pub struct VectorRow {
    /// The fact id this vector belongs to.
    pub id: Uuid,
    /// An L2-normalised embedding vector.
    pub vector: Vec<f32>,
    /// The fact's category label, carried for scoring without a KV round-trip.
    pub category: String,
    /// The fact's importance, carried for the dynamic-salience multiplier.
    pub importance: f64,
}

/// A nearest-neighbour search hit.
#[derive(Debug, Clone, Copy)]
pub struct VectorCandidate {
    /// The matching fact's id.
    pub id: Uuid,
    /// Cosine similarity in `[min_score, 1]`.
    pub cosine: f32,
}

/// Approximate nearest-neighbour search over L2-normalised vectors for the
/// configured embedding model, with idempotent upsert by id.
///
/// Dimension is fixed at open and must match the embedding model; a mismatch
/// is a fatal [`crate::Error::Integrity`].
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the vector for `row.id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Integrity`] if `row.vector.len()` does not
    /// match the index's configured dimension.
    async fn upsert(&self, row: VectorRow) -> Result<()>;

    /// Return the top `k` matches with cosine similarity `>= min_score`,
    /// sorted descending.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn search(&self, vector: &[f32], k: usize, min_score: f32) -> Result<Vec<VectorCandidate>>;

    /// Whether any stored vector has cosine similarity `>= threshold` to `vector`.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn has_near_duplicate(&self, vector: &[f32], threshold: f32) -> Result<bool>;

    /// Remove the vector for `id`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Number of rows currently stored.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn count(&self) -> Result<u64>;

    /// The fixed vector dimension this index was opened with.
    fn dimension(&self) -> usize;
}
