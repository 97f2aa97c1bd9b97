//! Fixtures and helpers shared by `memory-core` and `memory-storage-redb`
//! integration tests: a deterministic stub embedder, a ready-to-use
//! `Engine` over a temporary redb root, and sample `Fact`/`StoreArgs` data.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use memory_core::providers::{Chat, Embedder};
use memory_core::types::{Category, DecayClass, Fact, MemoryConfig, Scope, Tier};
use memory_core::{Engine, Result};
use uuid::Uuid;

/// Fixed embedding dimension used by every fixture in this crate.
pub const TEST_EMBEDDING_DIMENSION: usize = 16;

/// Deterministic, dependency-free embedder: hashes the input text into a
/// fixed-length vector so cosine search is exercised without a real model.
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    /// Construct a stub embedder producing `dimension`-length vectors.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(TEST_EMBEDDING_DIMENSION)
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        for (i, byte) in text.bytes().enumerate() {
            let slot = i % self.dimension;
            vector[slot] += f32::from(byte) / 255.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic stub chat provider returning a fixed response, for
/// exercising chat-gated code paths (hypothetical-answer expansion,
/// over-budget summarisation) without a real LLM.
pub struct StubChat {
    response: String,
}

impl StubChat {
    /// Construct a stub chat provider that always returns `response`.
    #[must_use]
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl Chat for StubChat {
    async fn complete(
        &self,
        _model: &str,
        _prompt: &str,
        _temperature: f32,
        _max_tokens: usize,
    ) -> Result<String> {
        Ok(self.response.clone())
    }
}

/// A sample fact, current and unscoped, ready to be mutated for a specific test.
#[must_use]
pub fn sample_fact(text: &str) -> Fact {
    let now = Utc::now();
    Fact {
        id: Uuid::new_v4(),
        text: text.to_string(),
        summary: None,
        category: Category::Fact,
        entity: None,
        key: None,
        value: None,
        importance: 0.5,
        confidence: 0.9,
        decay_class: DecayClass::Active,
        tier: Tier::Warm,
        scope: Scope::Global,
        source: "test".to_string(),
        source_date: None,
        created_at: now,
        last_confirmed_at: now,
        last_accessed_at: now,
        expires_at: None,
        tags: Vec::new(),
        recall_count: 0,
        reinforced_count: 0,
        reinforced_quotes: Vec::new(),
        last_reinforced_at: None,
        promoted_at: None,
        supersedes_id: None,
        superseded_by_id: None,
        superseded_at: None,
        valid_from: now,
        valid_to: None,
        hash_normalized: text.to_lowercase(),
        embedding_ref: None,
    }
}

/// A `MemoryConfig` sized for fast tests: a small embedding dimension and
/// `root` left blank since callers resolve it to a temp directory themselves.
/// The vault is disabled by default so ordinary tests don't need to
/// serialize on [`memory_storage_redb::VAULT_PASSPHRASE_ENV_VAR`]; tests that
/// exercise the vault should flip `credentials.enabled` back on and set the
/// passphrase env var under `#[serial_test::serial]`.
#[must_use]
pub fn test_config() -> MemoryConfig {
    let mut config = MemoryConfig::default();
    config.embedding_dimension = TEST_EMBEDDING_DIMENSION;
    config.credentials.enabled = false;
    config
}

/// Open an `Engine` over a fresh redb-backed store rooted at `root`, wired
/// with a [`StubEmbedder`] and no classifier or chat provider.
///
/// # Errors
///
/// Returns an error if any backend fails to open or migrate.
pub async fn open_test_engine(root: &std::path::Path) -> Result<Engine> {
    open_test_engine_with_config(root, test_config()).await
}

/// Like [`open_test_engine`] but with caller-supplied configuration.
///
/// # Errors
///
/// Returns an error if any backend fails to open or migrate.
pub async fn open_test_engine_with_config(
    root: &std::path::Path,
    config: MemoryConfig,
) -> Result<Engine> {
    let backends = memory_storage_redb::open_backends(root, &config).await?;
    let embedder: Arc<dyn Embedder> = Arc::new(StubEmbedder::new(config.embedding_dimension));

    Engine::open(
        backends.kv,
        backends.vectors,
        backends.wal,
        backends.vault,
        Some(embedder),
        None,
        None,
        root,
        config,
    )
    .await
}

/// Like [`open_test_engine_with_config`] but also wires up `chat` as the
/// engine's `Chat` provider, for tests that exercise hypothetical-answer
/// expansion or over-budget summarisation.
///
/// # Errors
///
/// Returns an error if any backend fails to open or migrate.
pub async fn open_test_engine_with_chat(
    root: &std::path::Path,
    config: MemoryConfig,
    chat: Arc<dyn Chat>,
) -> Result<Engine> {
    let backends = memory_storage_redb::open_backends(root, &config).await?;
    let embedder: Arc<dyn Embedder> = Arc::new(StubEmbedder::new(config.embedding_dimension));

    Engine::open(
        backends.kv,
        backends.vectors,
        backends.wal,
        backends.vault,
        Some(embedder),
        None,
        Some(chat),
        root,
        config,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_embedder_is_deterministic_and_normalised() {
        let embedder = StubEmbedder::new(8);
        let a = embedder.embed("hello world").await.unwrap();
        let b = embedder.embed("hello world").await.unwrap();
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn open_test_engine_migrates_and_reports_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_test_engine(dir.path()).await.unwrap();
        assert!(engine.health_check().await.is_healthy());
    }
}
