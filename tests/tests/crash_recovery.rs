//! Scenario 3 (spec §8): a crash between the WAL append and the WAL clear
//! must not lose the write. Opening the engine again replays the pending
//! record into both indexes and the fact becomes durable and searchable.

use chrono::Utc;
use memory_core::storage::WriteAheadLog;
use memory_core::types::{
    Category, DecayClass, Scope, WalOperation, WalPayload, WalRecord,
};
use test_utils::{test_config, StubEmbedder, TEST_EMBEDDING_DIMENSION};
use uuid::Uuid;

#[tokio::test]
async fn pending_wal_record_is_replayed_on_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config();

    let id = Uuid::new_v4();
    let embedder = StubEmbedder::new(TEST_EMBEDDING_DIMENSION);
    let vector = {
        use memory_core::providers::Embedder;
        embedder.embed("Deploy target is us-east-1").await.unwrap()
    };

    {
        // Simulate a crash-stop right after the WAL append, before the KV
        // insert and vector upsert: open the backends, append a record, and
        // drop them without clearing it or inserting anything.
        let backends = memory_storage_redb::open_backends(dir.path(), &config)
            .await
            .unwrap();
        let record = WalRecord {
            id,
            timestamp_ms: Utc::now().timestamp_millis(),
            operation: WalOperation::Store,
            data: WalPayload {
                text: "Deploy target is us-east-1".to_string(),
                category: Category::Fact.label().to_string(),
                importance: 0.6,
                entity: None,
                key: None,
                value: None,
                source: "user-explicit".to_string(),
                decay_class: Some(DecayClass::Stable),
                summary: None,
                tags: None,
                scope: Scope::Global,
                vector: Some(vector),
            },
        };
        backends.wal.append(&record).await.unwrap();
    }

    // Reopening the engine runs crash recovery before returning.
    let engine = test_utils::open_test_engine_with_config(dir.path(), config)
        .await
        .unwrap();

    let recovered = engine.facts.get(id).await.unwrap();
    let recovered = recovered.expect("pending WAL record was replayed into the KV index");
    assert_eq!(recovered.text, "Deploy target is us-east-1");
    assert_eq!(recovered.decay_class, DecayClass::Stable);

    let request = memory_core::retrieval::RecallRequest {
        query: "us-east-1".to_string(),
        format: memory_core::types::InjectionFormat::Full,
        ..Default::default()
    };
    let result = engine.pipeline.recall(&request).await.unwrap();
    assert_eq!(result.block.included_ids.first(), Some(&id));
}

#[tokio::test]
async fn stale_wal_record_is_pruned_without_replay() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.wal.max_age_ms = 1;

    let id = Uuid::new_v4();
    {
        let backends = memory_storage_redb::open_backends(dir.path(), &config)
            .await
            .unwrap();
        let record = WalRecord {
            id,
            // Far enough in the past that it is always older than `max_age_ms`.
            timestamp_ms: Utc::now().timestamp_millis() - 60_000,
            operation: WalOperation::Store,
            data: WalPayload {
                text: "Stale note".to_string(),
                category: Category::Fact.label().to_string(),
                importance: 0.5,
                entity: None,
                key: None,
                value: None,
                source: "user-explicit".to_string(),
                decay_class: Some(DecayClass::Active),
                summary: None,
                tags: None,
                scope: Scope::Global,
                vector: None,
            },
        };
        backends.wal.append(&record).await.unwrap();
    }

    let engine = test_utils::open_test_engine_with_config(dir.path(), config)
        .await
        .unwrap();
    assert!(engine.facts.get(id).await.unwrap().is_none());
}
