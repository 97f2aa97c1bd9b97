//! Crash recovery: replays or prunes WAL records left behind by a
//! crash-stop during a compound write, guaranteeing that after recovery
//! either both indexes contain a write or neither does.

use chrono::Utc;
use tracing::{info, warn};

use crate::extraction::hash_normalized;
use crate::storage::{KeyValueIndex, VectorIndex, VectorRow, WriteAheadLog};
use crate::types::{Fact, Tier, WalOperation, WalRecord};
use crate::Result;

/// Recover from a prior crash: replay still-pending WAL records younger than
/// `max_age_ms` whose fact is not already durable in the `KeyValueIndex`;
/// prune (without replay) anything older, logging each pruned record.
///
/// # Errors
///
/// Returns an error if reading the pending-record list fails. Individual
/// record replay failures are logged and the record is left pending for the
/// next recovery pass rather than aborting the whole run.
pub async fn recover(
    wal: &dyn WriteAheadLog,
    kv: &dyn KeyValueIndex,
    vectors: &dyn VectorIndex,
    max_age_ms: i64,
) -> Result<()> {
    let pending = wal.pending().await?;
    if pending.is_empty() {
        return Ok(());
    }

    let now_ms = Utc::now().timestamp_millis();
    let mut replayed = 0u64;
    let mut pruned = 0u64;

    for record in pending {
        let age_ms = now_ms - record.timestamp_ms;
        if age_ms > max_age_ms {
            warn!(record_id = %record.id, age_ms, "pruning stale WAL record without replay");
            wal.clear(record.id).await?;
            pruned += 1;
            continue;
        }

        match record.operation {
            WalOperation::Store | WalOperation::Update => {
                if let Err(e) = replay_record(&record, kv, vectors).await {
                    warn!(record_id = %record.id, error = %e, "WAL replay failed, leaving record pending");
                    continue;
                }
                wal.clear(record.id).await?;
                replayed += 1;
            }
        }
    }

    info!(replayed, pruned, "WAL recovery complete");
    Ok(())
}

async fn replay_record(
    record: &WalRecord,
    kv: &dyn KeyValueIndex,
    vectors: &dyn VectorIndex,
) -> Result<()> {
    let hash = hash_normalized(&record.data.text);
    if kv.find_by_hash(&hash).await?.is_some() {
        return Ok(());
    }

    let now = Utc::now();
    let decay_class = record.data.decay_class.unwrap_or(crate::types::DecayClass::Active);
    let fact = Fact {
        id: record.id,
        text: record.data.text.clone(),
        summary: record.data.summary.clone(),
        category: record.data.category(),
        entity: record.data.entity.clone(),
        key: record.data.key.clone(),
        value: record.data.value.clone(),
        importance: record.data.importance,
        confidence: 0.9,
        decay_class,
        tier: Tier::Warm,
        scope: record.data.scope.clone(),
        source: record.data.source.clone(),
        source_date: None,
        created_at: now,
        last_confirmed_at: now,
        last_accessed_at: now,
        expires_at: crate::constants::decay_class_ttl(decay_class)
            .map(|ttl| now + chrono::Duration::from_std(ttl).unwrap_or_default()),
        tags: record.data.tags.clone().unwrap_or_default(),
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
        hash_normalized: hash,
        embedding_ref: record.data.vector.as_ref().map(|_| record.id),
    };

    kv.insert(fact).await?;

    if let Some(vector) = &record.data.vector {
        vectors
            .upsert(VectorRow {
                id: record.id,
                vector: vector.clone(),
                category: record.data.category.clone(),
                importance: record.data.importance,
            })
            .await?;
    }

    Ok(())
}
