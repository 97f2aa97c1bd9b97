use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{Fact, FactLink, FactPatch, LinkType, Procedure, Scope};
use crate::Result;

/// Predicates honoured by [`KeyValueIndex::get`].
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Read the fact as it was valid at this instant, rather than "now".
    pub as_of: Option<DateTime<Utc>>,
    /// Restrict the read to facts visible to this scope.
    pub scope_filter: Option<Scope>,
}

/// Predicates honoured by [`KeyValueIndex::lookup`].
#[derive(Debug, Clone, Default)]
pub struct LookupOptions {
    /// Restrict to a specific key within the entity, if set.
    pub key: Option<String>,
    /// Restrict to facts carrying this tag, if set.
    pub tag: Option<String>,
    /// Restrict the read to facts visible to this scope.
    pub scope_filter: Option<Scope>,
}

/// A full-text search hit: a fact id and its implementation-defined relevance
/// in `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct FtsCandidate {
    /// The matching fact's id.
    pub id: Uuid,
    /// Relevance score in `[0, 1]`, including any reinforcement boost.
    pub raw_score: f64,
}

/// Durable, transactional store for facts, links, procedures, and checkpoints,
/// plus the tokenised inverted index used for full-text search.
///
/// Implementations must be single-writer/many-reader: concurrent readers may
/// proceed while a write transaction is open, but writers serialize among
/// themselves.
#[async_trait]
pub trait KeyValueIndex: Send + Sync {
    /// Insert a new fact.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Duplicate`] if fuzzy dedupe is enabled and
    /// `hash_normalized` already matches a current fact.
    async fn insert(&self, fact: Fact) -> Result<Uuid>;

    /// Fetch a fact by id, honouring `opts`'s temporal and scope predicates.
    ///
    /// # Errors
    ///
    /// Returns an error only on storage failure; a missing or filtered-out
    /// fact yields `Ok(None)`.
    async fn get(&self, id: Uuid, opts: GetOptions) -> Result<Option<Fact>>;

    /// Apply a partial update to an existing fact.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if `id` does not exist.
    async fn update(&self, id: Uuid, patch: FactPatch) -> Result<()>;

    /// Full-text search, returning at most `limit * 3` candidates ordered by
    /// descending `raw_score`.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn search_fts(
        &self,
        query: &str,
        limit: usize,
        reinforcement_boost: f64,
        include_cold: bool,
    ) -> Result<Vec<FtsCandidate>>;

    /// Exact-match lookup by entity (and optionally key/tag), each hit scored `1.0`.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn lookup(&self, entity: &str, opts: LookupOptions) -> Result<Vec<Uuid>>;

    /// Count current facts matching a category, or all current facts if `None`.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn count(&self, category: Option<&str>) -> Result<u64>;

    /// Whether a current fact already has this normalised hash.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn find_by_hash(&self, hash_normalized: &str) -> Result<Option<Uuid>>;

    /// Hard-delete a fact and its links.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// List all current facts, for use by the scheduler's batch passes.
    /// Implementations may page internally; callers should not assume this
    /// is cheap for large stores.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn list_current(&self) -> Result<Vec<Fact>>;

    /// Create or strengthen a typed edge between two facts.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn upsert_link(&self, link: FactLink) -> Result<()>;

    /// Fetch the outgoing and incoming edges touching `id`.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn links_for(&self, id: Uuid) -> Result<Vec<FactLink>>;

    /// Fetch a specific edge, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn get_link(
        &self,
        source_id: Uuid,
        target_id: Uuid,
        link_type: LinkType,
    ) -> Result<Option<FactLink>>;

    /// Insert a new procedure.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn insert_procedure(&self, procedure: Procedure) -> Result<Uuid>;

    /// Fetch a procedure by id.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn get_procedure(&self, id: Uuid) -> Result<Option<Procedure>>;

    /// Replace a procedure's full contents.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if `id` does not exist.
    async fn put_procedure(&self, procedure: Procedure) -> Result<()>;

    /// List all procedures, for use by `ProcedureStore::search`.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn list_procedures(&self) -> Result<Vec<Procedure>>;

    /// Apply ordered schema migrations. Additive migrations must be
    /// idempotent (check-before-add) so repeated `open` calls are safe.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Integrity`] if the on-disk schema is newer
    /// than this implementation understands.
    async fn migrate(&self) -> Result<()>;
}
