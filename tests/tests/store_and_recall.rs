//! Scenario 1 (spec §8): store a fact, recall it by full-text match, and
//! confirm the packed block and access-boost feedback.

use memory_core::fact_store::StoreArgs;
use memory_core::retrieval::RecallRequest;
use memory_core::types::{Category, InjectionFormat};
use test_utils::open_test_engine;

#[tokio::test]
async fn store_then_recall_with_fts_match() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open_test_engine(dir.path()).await.unwrap();

    let args = StoreArgs {
        category: Some(Category::Preference),
        importance: Some(0.7),
        ..StoreArgs::new("User prefers dark mode", "user-explicit")
    };
    let outcome = engine.facts.store(args).await.unwrap();
    let fact = outcome.fact().expect("insert produces a fact").clone();

    let request = RecallRequest {
        query: "dark mode".to_string(),
        limit: 3,
        format: InjectionFormat::Full,
        ..RecallRequest::default()
    };
    let result = engine.pipeline.recall(&request).await.unwrap();

    assert_eq!(result.block.text, "- [fts/preference] User prefers dark mode");
    assert_eq!(result.block.included_ids, vec![fact.id]);

    let refreshed = engine.facts.get(fact.id).await.unwrap().unwrap();
    assert_eq!(refreshed.recall_count, 1);
}

#[tokio::test]
async fn unrelated_query_returns_empty_block() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open_test_engine(dir.path()).await.unwrap();

    engine
        .facts
        .store(StoreArgs::new("User prefers dark mode", "user-explicit"))
        .await
        .unwrap();

    let request = RecallRequest {
        query: "completely unrelated gardening tips".to_string(),
        format: InjectionFormat::Full,
        min_score: 0.95,
        ..RecallRequest::default()
    };
    let result = engine.pipeline.recall(&request).await.unwrap();
    assert!(result.block.text.is_empty());
}
