//! redb-backed `KeyValueIndex`: facts, their supersession history, typed
//! links, and procedures share one database file. Full-text search has no
//! dedicated inverted index — it scores current facts in-process by token
//! overlap, since the store's scale (a single agent's memory) does not
//! warrant a separate FTS engine.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use memory_core::storage::{FtsCandidate, GetOptions, KeyValueIndex, LookupOptions};
use memory_core::types::{Fact, FactLink, FactPatch, LinkType, Procedure};
use memory_core::{Error, Result};
use redb::{Database, ReadableTable};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::tables::{
    FACTS_TABLE, LINKS_TABLE, METADATA_SCHEMA_VERSION, METADATA_TABLE, PROCEDURES_TABLE,
    SCHEMA_VERSION,
};
use crate::util::with_db_timeout;

/// redb-backed implementation of `KeyValueIndex`.
pub struct RedbKeyValueIndex {
    db: Arc<Database>,
}

impl RedbKeyValueIndex {
    /// Open (creating if absent) the facts database at `path` and ensure its
    /// tables exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or opened.
    pub async fn open(path: &Path) -> Result<Self> {
        let path_buf = path.to_path_buf();
        let db = with_db_timeout(move || {
            Database::create(&path_buf)
                .map_err(|e| Error::Storage(format!("failed to open facts database: {e}")))
        })
        .await?;

        let index = Self { db: Arc::new(db) };
        index.ensure_tables().await?;
        Ok(index)
    }

    async fn ensure_tables(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
            {
                txn.open_table(FACTS_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open facts table: {e}")))?;
                txn.open_table(LINKS_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open links table: {e}")))?;
                txn.open_table(PROCEDURES_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open procedures table: {e}")))?;
                txn.open_table(METADATA_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open metadata table: {e}")))?;
            }
            txn.commit()
                .map_err(|e| Error::Storage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    fn read_all_facts(db: &Database) -> Result<Vec<Fact>> {
        let txn = db
            .begin_read()
            .map_err(|e| Error::Storage(format!("failed to begin read transaction: {e}")))?;
        let table = txn
            .open_table(FACTS_TABLE)
            .map_err(|e| Error::Storage(format!("failed to open facts table: {e}")))?;

        let mut facts = Vec::new();
        let iter = table
            .iter()
            .map_err(|e| Error::Storage(format!("failed to iterate facts: {e}")))?;
        for entry in iter {
            let (_, bytes) =
                entry.map_err(|e| Error::Storage(format!("failed to read fact entry: {e}")))?;
            let fact: Fact = postcard::from_bytes(bytes.value())
                .map_err(|e| Error::Serialization(format!("failed to deserialize fact: {e}")))?;
            facts.push(fact);
        }
        Ok(facts)
    }
}

fn link_type_label(link_type: LinkType) -> &'static str {
    match link_type {
        LinkType::Supersedes => "supersedes",
        LinkType::CausedBy => "caused_by",
        LinkType::PartOf => "part_of",
        LinkType::RelatedTo => "related_to",
        LinkType::DependsOn => "depends_on",
    }
}

fn link_key(source_id: Uuid, target_id: Uuid, link_type: LinkType) -> String {
    format!("{source_id}:{target_id}:{}", link_type_label(link_type))
}

/// Token-overlap relevance of `fact` against the already-lowercased,
/// whitespace-tokenised `query_tokens`. Returns `0.0` on no overlap.
fn score_fact(query_tokens: &HashSet<&str>, fact: &Fact) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let haystack = format!(
        "{} {} {} {} {}",
        fact.text,
        fact.summary.as_deref().unwrap_or_default(),
        fact.entity.as_deref().unwrap_or_default(),
        fact.key.as_deref().unwrap_or_default(),
        fact.tags.join(" "),
    )
    .to_lowercase();
    let haystack_tokens: HashSet<&str> = haystack.split_whitespace().collect();
    let overlap = query_tokens
        .iter()
        .filter(|t| haystack_tokens.contains(*t))
        .count();
    if overlap == 0 {
        return 0.0;
    }
    (overlap as f64 / query_tokens.len() as f64).min(1.0)
}

#[async_trait]
impl KeyValueIndex for RedbKeyValueIndex {
    #[instrument(skip(self, fact), fields(fact_id = %fact.id))]
    async fn insert(&self, fact: Fact) -> Result<Uuid> {
        let db = Arc::clone(&self.db);
        let id = fact.id;
        let key = id.to_string();
        let bytes = postcard::to_allocvec(&fact)
            .map_err(|e| Error::Serialization(format!("failed to serialize fact: {e}")))?;

        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
            {
                let mut table = txn
                    .open_table(FACTS_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open facts table: {e}")))?;
                table
                    .insert(key.as_str(), bytes.as_slice())
                    .map_err(|e| Error::Storage(format!("failed to insert fact: {e}")))?;
            }
            txn.commit()
                .map_err(|e| Error::Storage(format!("failed to commit transaction: {e}")))?;
            Ok(id)
        })
        .await
    }

    async fn get(&self, id: Uuid, opts: GetOptions) -> Result<Option<Fact>> {
        let db = Arc::clone(&self.db);
        let key = id.to_string();

        let fact = with_db_timeout(move || {
            let txn = db
                .begin_read()
                .map_err(|e| Error::Storage(format!("failed to begin read transaction: {e}")))?;
            let table = txn
                .open_table(FACTS_TABLE)
                .map_err(|e| Error::Storage(format!("failed to open facts table: {e}")))?;
            match table
                .get(key.as_str())
                .map_err(|e| Error::Storage(format!("failed to get fact: {e}")))?
            {
                Some(guard) => {
                    let fact: Fact = postcard::from_bytes(guard.value()).map_err(|e| {
                        Error::Serialization(format!("failed to deserialize fact: {e}"))
                    })?;
                    Ok(Some(fact))
                }
                None => Ok(None),
            }
        })
        .await?;

        let Some(fact) = fact else {
            return Ok(None);
        };
        if let Some(scope_filter) = &opts.scope_filter {
            if !fact.scope.visible_to(Some(scope_filter)) {
                return Ok(None);
            }
        }
        Ok(Some(fact))
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: Uuid, patch: FactPatch) -> Result<()> {
        let db = Arc::clone(&self.db);
        let key = id.to_string();

        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
            {
                let mut table = txn
                    .open_table(FACTS_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open facts table: {e}")))?;

                let mut fact: Fact = match table
                    .get(key.as_str())
                    .map_err(|e| Error::Storage(format!("failed to get fact: {e}")))?
                {
                    Some(guard) => postcard::from_bytes(guard.value()).map_err(|e| {
                        Error::Serialization(format!("failed to deserialize fact: {e}"))
                    })?,
                    None => return Err(Error::NotFound(id)),
                };

                if let Some(tier) = patch.tier {
                    fact.tier = tier;
                }
                if let Some(confidence) = patch.confidence {
                    fact.confidence = confidence;
                }
                if let Some(expires_at) = patch.expires_at {
                    fact.expires_at = expires_at;
                }
                if let Some(recall_count) = patch.recall_count {
                    fact.recall_count = recall_count;
                }
                if let Some(last_accessed_at) = patch.last_accessed_at {
                    fact.last_accessed_at = last_accessed_at;
                }
                if let Some(reinforced_count) = patch.reinforced_count {
                    fact.reinforced_count = reinforced_count;
                }
                if let Some(reinforced_quotes) = patch.reinforced_quotes {
                    fact.reinforced_quotes = reinforced_quotes;
                }
                if let Some(last_reinforced_at) = patch.last_reinforced_at {
                    fact.last_reinforced_at = last_reinforced_at;
                }
                if let Some(promoted_at) = patch.promoted_at {
                    fact.promoted_at = promoted_at;
                }
                if let Some(supersedes_id) = patch.supersedes_id {
                    fact.supersedes_id = supersedes_id;
                }
                if let Some(superseded_by_id) = patch.superseded_by_id {
                    fact.superseded_by_id = superseded_by_id;
                }
                if let Some(superseded_at) = patch.superseded_at {
                    fact.superseded_at = superseded_at;
                }
                if let Some(valid_to) = patch.valid_to {
                    fact.valid_to = valid_to;
                }
                if let Some(scope) = patch.scope {
                    fact.scope = scope;
                }
                if let Some(category) = patch.category {
                    fact.category = category;
                }

                let bytes = postcard::to_allocvec(&fact).map_err(|e| {
                    Error::Serialization(format!("failed to serialize fact: {e}"))
                })?;
                table
                    .insert(key.as_str(), bytes.as_slice())
                    .map_err(|e| Error::Storage(format!("failed to update fact: {e}")))?;
            }
            txn.commit()
                .map_err(|e| Error::Storage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(query = %query))]
    async fn search_fts(
        &self,
        query: &str,
        limit: usize,
        reinforcement_boost: f64,
        include_cold: bool,
    ) -> Result<Vec<FtsCandidate>> {
        let db = Arc::clone(&self.db);
        let query_lower = query.to_lowercase();

        with_db_timeout(move || {
            let query_tokens: HashSet<&str> = query_lower.split_whitespace().collect();
            if query_tokens.is_empty() {
                return Ok(Vec::new());
            }

            let now = Utc::now();
            let facts = Self::read_all_facts(&db)?;
            let mut candidates: Vec<FtsCandidate> = facts
                .iter()
                .filter(|f| f.is_current(now))
                .filter(|f| include_cold || f.tier != memory_core::types::Tier::Cold)
                .filter_map(|f| {
                    let mut score = score_fact(&query_tokens, f);
                    if score <= 0.0 {
                        return None;
                    }
                    if f.reinforced_count > 0 {
                        score = (score + reinforcement_boost).min(1.0);
                    }
                    Some(FtsCandidate {
                        id: f.id,
                        raw_score: score,
                    })
                })
                .collect();

            candidates.sort_by(|a, b| {
                b.raw_score
                    .partial_cmp(&a.raw_score)
                    .unwrap_or(Ordering::Equal)
            });
            candidates.truncate(limit.max(1) * 3);
            Ok(candidates)
        })
        .await
    }

    async fn lookup(&self, entity: &str, opts: LookupOptions) -> Result<Vec<Uuid>> {
        let db = Arc::clone(&self.db);
        let entity_lower = entity.to_lowercase();

        with_db_timeout(move || {
            let now = Utc::now();
            let facts = Self::read_all_facts(&db)?;
            let hits = facts
                .iter()
                .filter(|f| f.is_current(now))
                .filter(|f| {
                    f.entity
                        .as_deref()
                        .is_some_and(|e| e.to_lowercase() == entity_lower)
                })
                .filter(|f| {
                    opts.key
                        .as_deref()
                        .is_none_or(|k| f.key.as_deref() == Some(k))
                })
                .filter(|f| {
                    opts.tag
                        .as_deref()
                        .is_none_or(|t| f.tags.iter().any(|tag| tag == t))
                })
                .filter(|f| {
                    opts.scope_filter
                        .as_ref()
                        .is_none_or(|s| f.scope.visible_to(Some(s)))
                })
                .map(|f| f.id)
                .collect();
            Ok(hits)
        })
        .await
    }

    async fn count(&self, category: Option<&str>) -> Result<u64> {
        let db = Arc::clone(&self.db);
        let category = category.map(str::to_string);

        with_db_timeout(move || {
            let now = Utc::now();
            let facts = Self::read_all_facts(&db)?;
            let count = facts
                .iter()
                .filter(|f| f.is_current(now))
                .filter(|f| {
                    category
                        .as_deref()
                        .is_none_or(|c| f.category.label() == c)
                })
                .count();
            Ok(count as u64)
        })
        .await
    }

    async fn find_by_hash(&self, hash_normalized: &str) -> Result<Option<Uuid>> {
        let db = Arc::clone(&self.db);
        let hash = hash_normalized.to_string();

        with_db_timeout(move || {
            let now = Utc::now();
            let facts = Self::read_all_facts(&db)?;
            Ok(facts
                .into_iter()
                .find(|f| f.is_current(now) && f.hash_normalized == hash)
                .map(|f| f.id))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<()> {
        let db = Arc::clone(&self.db);
        let key = id.to_string();

        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
            {
                let mut facts = txn
                    .open_table(FACTS_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open facts table: {e}")))?;
                facts
                    .remove(key.as_str())
                    .map_err(|e| Error::Storage(format!("failed to delete fact: {e}")))?;

                let mut links = txn
                    .open_table(LINKS_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open links table: {e}")))?;
                let stale_keys: Vec<String> = links
                    .iter()
                    .map_err(|e| Error::Storage(format!("failed to iterate links: {e}")))?
                    .filter_map(|entry| entry.ok())
                    .filter_map(|(k, v)| {
                        let link: FactLink = postcard::from_bytes(v.value()).ok()?;
                        if link.source_id == id || link.target_id == id {
                            Some(k.value().to_string())
                        } else {
                            None
                        }
                    })
                    .collect();
                for stale_key in stale_keys {
                    links.remove(stale_key.as_str()).map_err(|e| {
                        Error::Storage(format!("failed to remove stale link: {e}"))
                    })?;
                }
            }
            txn.commit()
                .map_err(|e| Error::Storage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn list_current(&self) -> Result<Vec<Fact>> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let now = Utc::now();
            let facts = Self::read_all_facts(&db)?;
            Ok(facts.into_iter().filter(|f| f.is_current(now)).collect())
        })
        .await
    }

    async fn upsert_link(&self, link: FactLink) -> Result<()> {
        let db = Arc::clone(&self.db);
        let key = link_key(link.source_id, link.target_id, link.link_type);
        let bytes = postcard::to_allocvec(&link)
            .map_err(|e| Error::Serialization(format!("failed to serialize link: {e}")))?;

        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
            {
                let mut table = txn
                    .open_table(LINKS_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open links table: {e}")))?;
                table
                    .insert(key.as_str(), bytes.as_slice())
                    .map_err(|e| Error::Storage(format!("failed to upsert link: {e}")))?;
            }
            txn.commit()
                .map_err(|e| Error::Storage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn links_for(&self, id: Uuid) -> Result<Vec<FactLink>> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let txn = db
                .begin_read()
                .map_err(|e| Error::Storage(format!("failed to begin read transaction: {e}")))?;
            let table = txn
                .open_table(LINKS_TABLE)
                .map_err(|e| Error::Storage(format!("failed to open links table: {e}")))?;

            let mut links = Vec::new();
            let iter = table
                .iter()
                .map_err(|e| Error::Storage(format!("failed to iterate links: {e}")))?;
            for entry in iter {
                let (_, bytes) = entry
                    .map_err(|e| Error::Storage(format!("failed to read link entry: {e}")))?;
                let link: FactLink = postcard::from_bytes(bytes.value()).map_err(|e| {
                    Error::Serialization(format!("failed to deserialize link: {e}"))
                })?;
                if link.source_id == id || link.target_id == id {
                    links.push(link);
                }
            }
            Ok(links)
        })
        .await
    }

    async fn get_link(
        &self,
        source_id: Uuid,
        target_id: Uuid,
        link_type: LinkType,
    ) -> Result<Option<FactLink>> {
        let db = Arc::clone(&self.db);
        let key = link_key(source_id, target_id, link_type);

        with_db_timeout(move || {
            let txn = db
                .begin_read()
                .map_err(|e| Error::Storage(format!("failed to begin read transaction: {e}")))?;
            let table = txn
                .open_table(LINKS_TABLE)
                .map_err(|e| Error::Storage(format!("failed to open links table: {e}")))?;
            match table
                .get(key.as_str())
                .map_err(|e| Error::Storage(format!("failed to get link: {e}")))?
            {
                Some(guard) => {
                    let link: FactLink = postcard::from_bytes(guard.value()).map_err(|e| {
                        Error::Serialization(format!("failed to deserialize link: {e}"))
                    })?;
                    Ok(Some(link))
                }
                None => Ok(None),
            }
        })
        .await
    }

    #[instrument(skip(self, procedure), fields(procedure_id = %procedure.id))]
    async fn insert_procedure(&self, procedure: Procedure) -> Result<Uuid> {
        let db = Arc::clone(&self.db);
        let id = procedure.id;
        let key = id.to_string();
        let bytes = postcard::to_allocvec(&procedure)
            .map_err(|e| Error::Serialization(format!("failed to serialize procedure: {e}")))?;

        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
            {
                let mut table = txn.open_table(PROCEDURES_TABLE).map_err(|e| {
                    Error::Storage(format!("failed to open procedures table: {e}"))
                })?;
                table
                    .insert(key.as_str(), bytes.as_slice())
                    .map_err(|e| Error::Storage(format!("failed to insert procedure: {e}")))?;
            }
            txn.commit()
                .map_err(|e| Error::Storage(format!("failed to commit transaction: {e}")))?;
            Ok(id)
        })
        .await
    }

    async fn get_procedure(&self, id: Uuid) -> Result<Option<Procedure>> {
        let db = Arc::clone(&self.db);
        let key = id.to_string();

        with_db_timeout(move || {
            let txn = db
                .begin_read()
                .map_err(|e| Error::Storage(format!("failed to begin read transaction: {e}")))?;
            let table = txn.open_table(PROCEDURES_TABLE).map_err(|e| {
                Error::Storage(format!("failed to open procedures table: {e}"))
            })?;
            match table
                .get(key.as_str())
                .map_err(|e| Error::Storage(format!("failed to get procedure: {e}")))?
            {
                Some(guard) => {
                    let procedure: Procedure =
                        postcard::from_bytes(guard.value()).map_err(|e| {
                            Error::Serialization(format!("failed to deserialize procedure: {e}"))
                        })?;
                    Ok(Some(procedure))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn put_procedure(&self, procedure: Procedure) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = procedure.id;
        let key = id.to_string();
        let bytes = postcard::to_allocvec(&procedure)
            .map_err(|e| Error::Serialization(format!("failed to serialize procedure: {e}")))?;

        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
            {
                let mut table = txn.open_table(PROCEDURES_TABLE).map_err(|e| {
                    Error::Storage(format!("failed to open procedures table: {e}"))
                })?;
                if table
                    .get(key.as_str())
                    .map_err(|e| Error::Storage(format!("failed to get procedure: {e}")))?
                    .is_none()
                {
                    return Err(Error::NotFound(id));
                }
                table
                    .insert(key.as_str(), bytes.as_slice())
                    .map_err(|e| Error::Storage(format!("failed to replace procedure: {e}")))?;
            }
            txn.commit()
                .map_err(|e| Error::Storage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn list_procedures(&self) -> Result<Vec<Procedure>> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let txn = db
                .begin_read()
                .map_err(|e| Error::Storage(format!("failed to begin read transaction: {e}")))?;
            let table = txn.open_table(PROCEDURES_TABLE).map_err(|e| {
                Error::Storage(format!("failed to open procedures table: {e}"))
            })?;

            let mut procedures = Vec::new();
            let iter = table
                .iter()
                .map_err(|e| Error::Storage(format!("failed to iterate procedures: {e}")))?;
            for entry in iter {
                let (_, bytes) = entry.map_err(|e| {
                    Error::Storage(format!("failed to read procedure entry: {e}"))
                })?;
                let procedure: Procedure = postcard::from_bytes(bytes.value()).map_err(|e| {
                    Error::Serialization(format!("failed to deserialize procedure: {e}"))
                })?;
                procedures.push(procedure);
            }
            Ok(procedures)
        })
        .await
    }

    async fn migrate(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
            {
                let mut table = txn
                    .open_table(METADATA_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open metadata table: {e}")))?;

                let on_disk_version = table
                    .get(METADATA_SCHEMA_VERSION)
                    .map_err(|e| Error::Storage(format!("failed to read schema version: {e}")))?
                    .map(|guard| {
                        let bytes = guard.value();
                        u32::from_le_bytes(bytes.try_into().unwrap_or([0; 4]))
                    });

                match on_disk_version {
                    Some(version) if version > SCHEMA_VERSION => {
                        return Err(Error::Integrity(format!(
                            "on-disk schema version {version} is newer than this build ({SCHEMA_VERSION})"
                        )));
                    }
                    Some(version) if version == SCHEMA_VERSION => {}
                    _ => {
                        table
                            .insert(
                                METADATA_SCHEMA_VERSION,
                                SCHEMA_VERSION.to_le_bytes().as_slice(),
                            )
                            .map_err(|e| {
                                Error::Storage(format!("failed to write schema version: {e}"))
                            })?;
                        debug!(version = SCHEMA_VERSION, "facts database migrated");
                    }
                }
            }
            txn.commit()
                .map_err(|e| Error::Storage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_key_is_stable_and_directional() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(
            link_key(a, b, LinkType::RelatedTo),
            link_key(a, b, LinkType::RelatedTo)
        );
        assert_ne!(
            link_key(a, b, LinkType::RelatedTo),
            link_key(b, a, LinkType::RelatedTo)
        );
    }

    #[test]
    fn score_fact_rewards_token_overlap() {
        let now = Utc::now();
        let fact = Fact {
            id: Uuid::new_v4(),
            text: "User prefers dark mode in the editor".to_string(),
            summary: None,
            category: memory_core::types::Category::Preference,
            entity: None,
            key: None,
            value: None,
            importance: 0.5,
            confidence: 0.9,
            decay_class: memory_core::types::DecayClass::Stable,
            tier: memory_core::types::Tier::Warm,
            scope: memory_core::types::Scope::Global,
            source: "test".to_string(),
            source_date: None,
            created_at: now,
            last_confirmed_at: now,
            last_accessed_at: now,
            expires_at: None,
            tags: vec![],
            recall_count: 0,
            reinforced_count: 0,
            reinforced_quotes: vec![],
            last_reinforced_at: None,
            promoted_at: None,
            supersedes_id: None,
            superseded_by_id: None,
            superseded_at: None,
            valid_from: now,
            valid_to: None,
            hash_normalized: "user prefers dark mode in the editor".to_string(),
            embedding_ref: None,
        };
        let tokens: HashSet<&str> = "dark mode".split_whitespace().collect();
        assert!(score_fact(&tokens, &fact) > 0.0);

        let no_match: HashSet<&str> = "unrelated query".split_whitespace().collect();
        assert_eq!(score_fact(&no_match, &fact), 0.0);
    }
}
