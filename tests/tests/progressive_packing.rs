//! Scenario 4 (spec §8): with many matching facts and a tight token budget,
//! the progressive format lists numbered titles instead of full text, and a
//! later lookup resolves a numbered position back to its fact through the
//! adapter's cached position map.

use memory_core::fact_store::StoreArgs;
use memory_core::retrieval::RecallRequest;
use memory_core::types::InjectionFormat;
use test_utils::open_test_engine;

#[tokio::test]
async fn progressive_format_fits_many_facts_in_a_tight_budget_and_resolves_positions() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open_test_engine(dir.path()).await.unwrap();

    for i in 0..20 {
        engine
            .facts
            .store(StoreArgs::new(
                format!("unifi switch port {i} is configured for vlan {i}"),
                "user-explicit",
            ))
            .await
            .unwrap();
    }

    let request = RecallRequest {
        query: "unifi".to_string(),
        limit: 20,
        format: InjectionFormat::Progressive,
        max_tokens: 150,
        ..RecallRequest::default()
    };
    let result = engine.pipeline.recall(&request).await.unwrap();

    assert!(!result.block.positions.is_empty());
    assert!(
        result.block.positions.len() <= 10,
        "a 150-token budget should not fit all 20 full candidates as numbered entries"
    );
    for line in result.block.text.lines() {
        assert!(line.starts_with(char::is_numeric), "line should be a numbered entry: {line}");
    }

    engine.adapter.build_recall_block("unifi", request).await.unwrap();

    let first_id = *result.block.positions.get(&1).unwrap();
    let resolved = engine
        .adapter
        .resolve_progressive_position(1)
        .expect("position 1 resolves via the adapter's cached map");
    assert_eq!(resolved, first_id);

    assert!(engine.adapter.resolve_progressive_position(9999).is_none());
}
