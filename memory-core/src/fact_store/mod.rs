//! Operations on facts: insert, supersede, decay, prune, tier-migrate,
//! reinforce, link. The `FactStore` is the only component permitted to
//! mutate facts; it enforces the invariants in the data model by routing
//! every compound write through the write-ahead log.

mod lifecycle;
mod store;
mod supersede;
mod tiering;

pub use store::{StoreArgs, StoreOutcome};
pub use tiering::{TierCompactOptions, TierCompactStats};

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::category_registry::CategoryRegistry;
use crate::providers::{Chat, Classifier, Embedder};
use crate::storage::{CredentialVault, KeyValueIndex, VectorIndex, WriteAheadLog};
use crate::types::{Fact, MemoryConfig};
use crate::Result;

/// Operations on facts. Owns the compound-write discipline across the two
/// indexes via the WAL and enforces the data-model invariants.
pub struct FactStore {
    pub(crate) kv: Arc<dyn KeyValueIndex>,
    pub(crate) vectors: Arc<dyn VectorIndex>,
    pub(crate) wal: Arc<dyn WriteAheadLog>,
    pub(crate) vault: Option<Arc<dyn CredentialVault>>,
    pub(crate) embedder: Option<Arc<dyn Embedder>>,
    pub(crate) classifier: Option<Arc<dyn Classifier>>,
    pub(crate) chat: Option<Arc<dyn Chat>>,
    pub(crate) categories: Arc<CategoryRegistry>,
    pub(crate) config: MemoryConfig,
}

impl FactStore {
    /// Construct a `FactStore` over the given storage backends and optional
    /// external providers.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        kv: Arc<dyn KeyValueIndex>,
        vectors: Arc<dyn VectorIndex>,
        wal: Arc<dyn WriteAheadLog>,
        vault: Option<Arc<dyn CredentialVault>>,
        embedder: Option<Arc<dyn Embedder>>,
        classifier: Option<Arc<dyn Classifier>>,
        chat: Option<Arc<dyn Chat>>,
        categories: Arc<CategoryRegistry>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            kv,
            vectors,
            wal,
            vault,
            embedder,
            classifier,
            chat,
            categories,
            config,
        }
    }

    /// Fetch a fact by id, with no temporal or scope filtering applied.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn get(&self, id: Uuid) -> Result<Option<Fact>> {
        self.kv
            .get(id, crate::storage::GetOptions::default())
            .await
    }

    /// Compute the expiry timestamp implied by `decay_class`, anchored at `from`.
    #[must_use]
    pub(crate) fn compute_expiry(
        decay_class: crate::types::DecayClass,
        from: chrono::DateTime<Utc>,
    ) -> Option<chrono::DateTime<Utc>> {
        crate::constants::decay_class_ttl(decay_class)
            .map(|ttl| from + chrono::Duration::from_std(ttl).unwrap_or_default())
    }
}
