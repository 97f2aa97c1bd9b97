//! redb-backed `VectorIndex`: brute-force cosine search over L2-normalised
//! embedding rows. A single agent's memory store holds at most a few tens of
//! thousands of facts, well within the range where a linear scan beats the
//! complexity of an approximate nearest-neighbour structure.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use memory_core::storage::{VectorCandidate, VectorIndex, VectorRow};
use memory_core::{Error, Result};
use redb::{Database, ReadableTable};
use tracing::instrument;
use uuid::Uuid;

use crate::tables::VECTORS_TABLE;
use crate::util::with_db_timeout;

/// On-disk representation of a [`VectorRow`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StoredVector {
    vector: Vec<f32>,
    category: String,
    importance: f64,
}

/// redb-backed implementation of `VectorIndex`, fixed to `dimension` at open.
pub struct RedbVectorIndex {
    db: Arc<Database>,
    dimension: usize,
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl RedbVectorIndex {
    /// Open (creating if absent) the vector database at `path`, fixed to
    /// `dimension`-length vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or opened.
    pub async fn open(path: &Path, dimension: usize) -> Result<Self> {
        let path_buf = path.to_path_buf();
        let db = with_db_timeout(move || {
            Database::create(&path_buf)
                .map_err(|e| Error::Storage(format!("failed to open vector database: {e}")))
        })
        .await?;

        let index = Self {
            db: Arc::new(db),
            dimension,
        };
        index.ensure_table().await?;
        Ok(index)
    }

    async fn ensure_table(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
            {
                txn.open_table(VECTORS_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open vectors table: {e}")))?;
            }
            txn.commit()
                .map_err(|e| Error::Storage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    fn read_all(db: &Database) -> Result<Vec<(Uuid, StoredVector)>> {
        let txn = db
            .begin_read()
            .map_err(|e| Error::Storage(format!("failed to begin read transaction: {e}")))?;
        let table = txn
            .open_table(VECTORS_TABLE)
            .map_err(|e| Error::Storage(format!("failed to open vectors table: {e}")))?;

        let mut rows = Vec::new();
        let iter = table
            .iter()
            .map_err(|e| Error::Storage(format!("failed to iterate vectors: {e}")))?;
        for entry in iter {
            let (key, bytes) =
                entry.map_err(|e| Error::Storage(format!("failed to read vector entry: {e}")))?;
            let id = Uuid::parse_str(key.value())
                .map_err(|e| Error::Storage(format!("corrupt vector key: {e}")))?;
            let row: StoredVector = postcard::from_bytes(bytes.value()).map_err(|e| {
                Error::Serialization(format!("failed to deserialize vector row: {e}"))
            })?;
            rows.push((id, row));
        }
        Ok(rows)
    }
}

#[async_trait]
impl VectorIndex for RedbVectorIndex {
    #[instrument(skip(self, row), fields(fact_id = %row.id))]
    async fn upsert(&self, row: VectorRow) -> Result<()> {
        if row.vector.len() != self.dimension {
            return Err(Error::Integrity(format!(
                "vector dimension {} does not match index dimension {}",
                row.vector.len(),
                self.dimension
            )));
        }

        let db = Arc::clone(&self.db);
        let key = row.id.to_string();
        let stored = StoredVector {
            vector: row.vector,
            category: row.category,
            importance: row.importance,
        };
        let bytes = postcard::to_allocvec(&stored)
            .map_err(|e| Error::Serialization(format!("failed to serialize vector row: {e}")))?;

        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
            {
                let mut table = txn
                    .open_table(VECTORS_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open vectors table: {e}")))?;
                table
                    .insert(key.as_str(), bytes.as_slice())
                    .map_err(|e| Error::Storage(format!("failed to upsert vector row: {e}")))?;
            }
            txn.commit()
                .map_err(|e| Error::Storage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn search(&self, vector: &[f32], k: usize, min_score: f32) -> Result<Vec<VectorCandidate>> {
        if vector.len() != self.dimension {
            return Err(Error::Integrity(format!(
                "query vector dimension {} does not match index dimension {}",
                vector.len(),
                self.dimension
            )));
        }

        let db = Arc::clone(&self.db);
        let query = vector.to_vec();
        with_db_timeout(move || {
            let rows = Self::read_all(&db)?;
            let mut candidates: Vec<VectorCandidate> = rows
                .into_iter()
                .filter_map(|(id, row)| {
                    let cosine = cosine(&query, &row.vector);
                    if cosine >= min_score {
                        Some(VectorCandidate { id, cosine })
                    } else {
                        None
                    }
                })
                .collect();
            candidates.sort_by(|a, b| b.cosine.partial_cmp(&a.cosine).unwrap_or(Ordering::Equal));
            candidates.truncate(k);
            Ok(candidates)
        })
        .await
    }

    async fn has_near_duplicate(&self, vector: &[f32], threshold: f32) -> Result<bool> {
        let hits = self.search(vector, 1, threshold).await?;
        Ok(!hits.is_empty())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<()> {
        let db = Arc::clone(&self.db);
        let key = id.to_string();

        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
            {
                let mut table = txn
                    .open_table(VECTORS_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open vectors table: {e}")))?;
                table
                    .remove(key.as_str())
                    .map_err(|e| Error::Storage(format!("failed to delete vector row: {e}")))?;
            }
            txn.commit()
                .map_err(|e| Error::Storage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn count(&self) -> Result<u64> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || Ok(Self::read_all(&db)?.len() as u64)).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_handles_zero_vector_without_dividing_by_zero() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert_eq!(cosine(&a, &b), 0.0);
    }
}
