//! §4.8 step 9: when packing must drop candidates to fit the token budget
//! and `summarize_when_over_budget` is on, the pipeline replaces the
//! truncated body with an LLM summary of the full candidate list instead of
//! silently dropping the tail.

use std::sync::Arc;

use memory_core::fact_store::StoreArgs;
use memory_core::providers::Chat;
use memory_core::retrieval::RecallRequest;
use memory_core::types::InjectionFormat;
use test_utils::{open_test_engine_with_chat, test_config, StubChat};

const SUMMARY: &str = "Three unifi switch ports were reconfigured across different vlans.";

#[tokio::test]
async fn over_budget_recall_is_replaced_by_a_chat_summary() {
    let dir = tempfile::tempdir().unwrap();
    let chat: Arc<dyn Chat> = Arc::new(StubChat::new(SUMMARY));
    let engine = open_test_engine_with_chat(dir.path(), test_config(), chat)
        .await
        .unwrap();

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
        format: InjectionFormat::Full,
        max_tokens: 30,
        summarize_when_over_budget: true,
        ..RecallRequest::default()
    };
    let result = engine.pipeline.recall(&request).await.unwrap();

    assert_eq!(result.block.text, SUMMARY);
    assert!(
        result.block.included_ids.len() > 1,
        "the summary stands in for every candidate, not just what fit the budget"
    );
}

#[tokio::test]
async fn summarization_is_skipped_when_the_flag_is_off() {
    let dir = tempfile::tempdir().unwrap();
    let chat: Arc<dyn Chat> = Arc::new(StubChat::new(SUMMARY));
    let engine = open_test_engine_with_chat(dir.path(), test_config(), chat)
        .await
        .unwrap();

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
        format: InjectionFormat::Full,
        max_tokens: 30,
        summarize_when_over_budget: false,
        ..RecallRequest::default()
    };
    let result = engine.pipeline.recall(&request).await.unwrap();

    assert_ne!(result.block.text, SUMMARY);
}
