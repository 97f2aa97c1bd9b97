//! Scenario 6 (spec §8): when two facts are returned together by the same
//! recall call, the pipeline's feedback step strengthens (or creates) a
//! RELATED_TO edge between them. A second joint recall strengthens it again.

use memory_core::fact_store::StoreArgs;
use memory_core::retrieval::RecallRequest;
use memory_core::types::InjectionFormat;
use test_utils::open_test_engine;

#[tokio::test]
async fn facts_recalled_together_gain_a_strengthening_related_to_edge() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open_test_engine(dir.path()).await.unwrap();

    let p = engine
        .facts
        .store(StoreArgs::new(
            "The postgres cluster lives in us-east-1",
            "user-explicit",
        ))
        .await
        .unwrap()
        .fact()
        .unwrap()
        .clone();
    let q = engine
        .facts
        .store(StoreArgs::new(
            "The postgres cluster has a read replica in us-west-2",
            "user-explicit",
        ))
        .await
        .unwrap()
        .fact()
        .unwrap()
        .clone();

    let request = RecallRequest {
        query: "postgres cluster".to_string(),
        limit: 5,
        format: InjectionFormat::Full,
        graph_expansion: false,
        ..RecallRequest::default()
    };

    let first = engine.pipeline.recall(&request).await.unwrap();
    assert!(first.block.included_ids.contains(&p.id));
    assert!(first.block.included_ids.contains(&q.id));

    let after_first = engine.graph.connected(&[p.id], 1).await.unwrap();
    assert!(after_first.contains(&q.id), "first joint recall creates a RELATED_TO edge");

    engine.pipeline.recall(&request).await.unwrap();

    let p_fact = engine.facts.get(p.id).await.unwrap().unwrap();
    let q_fact = engine.facts.get(q.id).await.unwrap().unwrap();
    assert_eq!(p_fact.recall_count, 2);
    assert_eq!(q_fact.recall_count, 2);
}
