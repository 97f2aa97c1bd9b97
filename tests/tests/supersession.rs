//! Scenario 2 (spec §8): storing a fact that supersedes another retires the
//! old one, leaves a SUPERSEDES link, and `as_of` reads still see the old
//! fact before the supersession.

use chrono::Utc;
use memory_core::fact_store::StoreArgs;
use memory_core::retrieval::RecallRequest;
use memory_core::types::InjectionFormat;
use test_utils::open_test_engine;

#[tokio::test]
async fn superseding_a_fact_retires_it_and_links_the_replacement() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open_test_engine(dir.path()).await.unwrap();

    let before = Utc::now();

    let b1 = engine
        .facts
        .store(StoreArgs::new("Port is 8080", "user-explicit"))
        .await
        .unwrap()
        .fact()
        .unwrap()
        .clone();

    let b2_outcome = engine
        .facts
        .store(StoreArgs::new("Port is 9090", "user-explicit"))
        .await
        .unwrap();
    let b2 = b2_outcome.fact().unwrap().clone();
    engine.facts.supersede(b1.id, Some(b2.id)).await.unwrap();

    let request = RecallRequest {
        query: "port".to_string(),
        format: InjectionFormat::Full,
        ..RecallRequest::default()
    };
    let result = engine.pipeline.recall(&request).await.unwrap();
    assert_eq!(result.block.included_ids, vec![b2.id]);

    let old = engine.facts.get(b1.id).await.unwrap().unwrap();
    assert_eq!(old.superseded_by_id, Some(b2.id));
    assert!(old.superseded_at.is_some());

    let as_of_before = engine
        .facts
        .get(b1.id)
        .await
        .unwrap()
        .filter(|f| f.valid_at(before))
        .expect("fact was valid before supersession");
    assert_eq!(as_of_before.id, b1.id);

    let neighbours = engine.graph.connected(&[b2.id], 1).await.unwrap();
    assert!(
        neighbours.contains(&b1.id),
        "SUPERSEDES link makes the retired fact reachable from its replacement"
    );
}
