//! Owns all long-lived engine state behind a single handle. Timers and the
//! boundary adapter receive it by shared reference; a config reload
//! recreates the `Engine` and swaps it atomically rather than mutating
//! closures that captured stale database handles.

use std::sync::Arc;

use tracing::info;

use crate::adapter::BoundaryAdapter;
use crate::category_registry::CategoryRegistry;
use crate::fact_store::FactStore;
use crate::graph::GraphStore;
use crate::lifecycle_scheduler::{LifecycleScheduler, SchedulerIntervals};
use crate::procedure_store::ProcedureStore;
use crate::providers::{Chat, Classifier, Embedder};
use crate::retrieval::RetrievalPipeline;
use crate::storage::{CredentialVault, KeyValueIndex, VectorIndex, WriteAheadLog};
use crate::types::MemoryConfig;
use crate::Result;

/// Aggregate counts returned by [`Engine::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageStatistics {
    /// Total current facts.
    pub fact_count: u64,
    /// Total facts in the hot tier.
    pub hot_count: u64,
    /// Total facts in the warm tier.
    pub warm_count: u64,
    /// Total facts in the cold tier.
    pub cold_count: u64,
    /// Total fact links.
    pub link_count: u64,
    /// Total procedures.
    pub procedure_count: u64,
    /// Current vector index row count.
    pub vector_count: u64,
}

/// Result of [`Engine::health_check`]: whether each subsystem answered
/// without mutating anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthStatus {
    /// The `KeyValueIndex` responded to a read.
    pub kv_reachable: bool,
    /// The `VectorIndex` responded to a read.
    pub vector_reachable: bool,
    /// The WAL file size could be read.
    pub wal_reachable: bool,
}

impl HealthStatus {
    /// Whether every checked subsystem is reachable.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.kv_reachable && self.vector_reachable && self.wal_reachable
    }
}

/// The single long-lived handle to every engine subsystem.
pub struct Engine {
    /// Fact lifecycle operations.
    pub facts: Arc<FactStore>,
    /// Graph layer.
    pub graph: Arc<GraphStore>,
    /// Procedure store.
    pub procedures: Arc<ProcedureStore>,
    /// Retrieval pipeline.
    pub pipeline: Arc<RetrievalPipeline>,
    /// Host event adapter.
    pub adapter: Arc<BoundaryAdapter>,
    /// Background maintenance scheduler.
    pub scheduler: Arc<LifecycleScheduler>,
    kv: Arc<dyn KeyValueIndex>,
    vectors: Arc<dyn VectorIndex>,
    wal: Arc<dyn WriteAheadLog>,
    config: MemoryConfig,
}

impl Engine {
    /// Assemble an `Engine` from already-opened storage backends and
    /// optional external providers. Applies pending schema migrations and
    /// replays any recoverable WAL records before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if migration or WAL recovery fails.
    #[allow(clippy::too_many_arguments)]
    pub async fn open(
        kv: Arc<dyn KeyValueIndex>,
        vectors: Arc<dyn VectorIndex>,
        wal: Arc<dyn WriteAheadLog>,
        vault: Option<Arc<dyn CredentialVault>>,
        embedder: Option<Arc<dyn Embedder>>,
        classifier: Option<Arc<dyn Classifier>>,
        chat: Option<Arc<dyn Chat>>,
        root: &std::path::Path,
        config: MemoryConfig,
    ) -> Result<Self> {
        kv.migrate().await?;

        let categories = Arc::new(CategoryRegistry::open(root)?);

        let facts = Arc::new(FactStore::new(
            Arc::clone(&kv),
            Arc::clone(&vectors),
            Arc::clone(&wal),
            vault,
            embedder.clone(),
            classifier,
            chat.clone(),
            categories,
            config.clone(),
        ));

        crate::recovery::recover(&*wal, &*kv, &*vectors, config.wal.max_age_ms).await?;

        let graph = Arc::new(GraphStore::new(Arc::clone(&kv)));
        let procedures = Arc::new(ProcedureStore::new(
            Arc::clone(&kv),
            config.store.promotion_threshold,
        ));
        let pipeline = Arc::new(RetrievalPipeline::new(
            Arc::clone(&kv),
            Arc::clone(&vectors),
            Arc::clone(&graph),
            Arc::clone(&facts),
            embedder,
            chat,
        ));
        let adapter = Arc::new(BoundaryAdapter::new(
            Arc::clone(&facts),
            Arc::clone(&pipeline),
            Arc::clone(&procedures),
            config.auto_capture,
            config.capture_max_chars,
            config.memory_tiering.clone(),
            config.procedures.clone(),
        ));
        let scheduler = Arc::new(LifecycleScheduler::new(
            Arc::clone(&facts),
            SchedulerIntervals::default(),
        ));

        info!("engine opened");

        Ok(Self {
            facts,
            graph,
            procedures,
            pipeline,
            adapter,
            scheduler,
            kv,
            vectors,
            wal,
            config,
        })
    }

    /// Aggregate counts across both indexes.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn stats(&self) -> Result<StorageStatistics> {
        let current = self.kv.list_current().await?;
        let mut stats = StorageStatistics {
            vector_count: self.vectors.count().await?,
            procedure_count: self.kv.list_procedures().await?.len() as u64,
            ..Default::default()
        };
        for fact in &current {
            stats.fact_count += 1;
            match fact.tier {
                crate::types::Tier::Hot => stats.hot_count += 1,
                crate::types::Tier::Warm => stats.warm_count += 1,
                crate::types::Tier::Cold => stats.cold_count += 1,
            }
        }
        let mut link_count = 0u64;
        for fact in &current {
            link_count += self.kv.links_for(fact.id).await?.len() as u64;
        }
        stats.link_count = link_count / 2;
        Ok(stats)
    }

    /// Verify both indexes and the WAL are reachable without mutating
    /// anything. Used by the scheduler before running a maintenance batch.
    pub async fn health_check(&self) -> HealthStatus {
        HealthStatus {
            kv_reachable: self.kv.count(None).await.is_ok(),
            vector_reachable: self.vectors.count().await.is_ok(),
            wal_reachable: self.wal.size_bytes().await.is_ok(),
        }
    }

    /// The configuration this engine was opened with.
    #[must_use]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }
}
