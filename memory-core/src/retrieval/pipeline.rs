use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::fact_store::FactStore;
use crate::graph::GraphStore;
use crate::providers::Chat;
use crate::storage::{GetOptions, KeyValueIndex, LookupOptions, VectorIndex};
use crate::types::{Fact, InjectionFormat, Scope, Tier};
use crate::Result;

use super::packing::{pack, render_full_bullet_list, PackedBlock, RankedCandidate};
use super::scoring::{
    access_count_boost, dynamic_salience, importance_recency_boost, prefer_long_term_boost,
};

/// Input to [`RetrievalPipeline::recall`].
#[derive(Debug, Clone)]
pub struct RecallRequest {
    /// The query text.
    pub query: String,
    /// Max candidates to pack.
    pub limit: usize,
    /// Minimum vector-search cosine score to consider a candidate.
    pub min_score: f32,
    /// Restrict to facts visible to this scope, if set.
    pub scope_filter: Option<Scope>,
    /// Restrict to facts carrying this tag, if set (skips vector search).
    pub tag: Option<String>,
    /// Restrict to facts matching this entity, if set.
    pub entity: Option<String>,
    /// Read facts as valid at this instant rather than "now".
    pub as_of: Option<DateTime<Utc>>,
    /// Include cold-tier facts.
    pub include_cold: bool,
    /// Include superseded facts.
    pub include_superseded: bool,
    /// Output packing format.
    pub format: InjectionFormat,
    /// Overall token budget for the packed block.
    pub max_tokens: usize,
    /// `reinforced_count > 0` boost added inside the FTS scorer.
    pub reinforcement_boost: f64,
    /// Multiply permanent/stable facts' score upward.
    pub prefer_long_term: bool,
    /// Apply the importance/recency multiplier during scoring.
    pub use_importance_recency: bool,
    /// Whether entity-lookup expansion runs.
    pub entity_lookup: bool,
    /// Whether graph expansion runs.
    pub graph_expansion: bool,
    /// Max traversal depth for graph expansion.
    pub graph_max_depth: u32,
    /// Recall-count threshold for `progressive_hybrid` pinning.
    pub progressive_pinned_recall_count: u64,
    /// Max facts added per expanded entity.
    pub max_facts_per_entity: usize,
    /// When packing must drop candidates to fit `max_tokens` (for the
    /// `full`/`short`/`minimal` formats), replace the truncated body with a
    /// 2-3 sentence LLM summary of the full candidate list instead of
    /// silently truncating. Falls back to truncated packing if the chat
    /// provider is unavailable or the call fails.
    pub summarize_when_over_budget: bool,
}

impl Default for RecallRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            limit: 10,
            min_score: 0.3,
            scope_filter: None,
            tag: None,
            entity: None,
            as_of: None,
            include_cold: false,
            include_superseded: false,
            format: InjectionFormat::Full,
            max_tokens: 1_500,
            reinforcement_boost: 0.1,
            prefer_long_term: true,
            use_importance_recency: true,
            entity_lookup: true,
            graph_expansion: true,
            graph_max_depth: 2,
            progressive_pinned_recall_count: 5,
            max_facts_per_entity: 3,
            summarize_when_over_budget: false,
        }
    }
}

/// The outcome of a `recall` call.
#[derive(Debug, Clone)]
pub struct RecallResult {
    /// The packed, formatted block.
    pub block: PackedBlock,
    /// How many candidates were considered before packing.
    pub candidate_count: usize,
}

/// The hybrid full-text + vector ranking engine.
pub struct RetrievalPipeline {
    kv: Arc<dyn KeyValueIndex>,
    vectors: Arc<dyn VectorIndex>,
    graph: Arc<GraphStore>,
    facts: Arc<FactStore>,
    embedder: Option<Arc<dyn crate::providers::Embedder>>,
    chat: Option<Arc<dyn Chat>>,
}

impl RetrievalPipeline {
    /// Construct a `RetrievalPipeline` over the given backends.
    #[must_use]
    pub fn new(
        kv: Arc<dyn KeyValueIndex>,
        vectors: Arc<dyn VectorIndex>,
        graph: Arc<GraphStore>,
        facts: Arc<FactStore>,
        embedder: Option<Arc<dyn crate::providers::Embedder>>,
        chat: Option<Arc<dyn Chat>>,
    ) -> Self {
        Self {
            kv,
            vectors,
            graph,
            facts,
            embedder,
            chat,
        }
    }

    /// Run the full retrieval algorithm: FTS + vector candidates, merge,
    /// entity-lookup and graph expansion, boosts, sort, pack, and feedback.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure. External-service failures
    /// (embedder, chat) degrade gracefully to FTS-only results rather than
    /// propagating.
    #[instrument(skip(self, request), fields(query = %request.query))]
    pub async fn recall(&self, request: &RecallRequest) -> Result<RecallResult> {
        let now = Utc::now();
        let as_of = request.as_of.unwrap_or(now);

        let mut merged: HashMap<Uuid, (Fact, f64, &'static str)> = HashMap::new();

        let fts_hits = self
            .kv
            .search_fts(
                &request.query,
                request.limit,
                request.reinforcement_boost,
                request.include_cold,
            )
            .await?;

        for hit in fts_hits {
            if let Some(fact) = self.fetch_visible(hit.id, request, as_of).await? {
                merged.insert(hit.id, (fact, hit.raw_score, "fts"));
            }
        }

        if request.tag.is_none() {
            if let Err(e) = self.add_vector_candidates(request, as_of, &mut merged).await {
                warn!(error = %e, "vector expansion failed, continuing with FTS-only candidates");
            }
        }

        if request.entity_lookup {
            if let Some(entity) = &request.entity {
                let hits = self
                    .kv
                    .lookup(
                        entity,
                        LookupOptions {
                            scope_filter: request.scope_filter.clone(),
                            ..Default::default()
                        },
                    )
                    .await?;
                for id in hits.into_iter().take(request.max_facts_per_entity) {
                    if !merged.contains_key(&id) {
                        if let Some(fact) = self.fetch_visible(id, request, as_of).await? {
                            merged.insert(id, (fact, 1.0, "entity"));
                        }
                    }
                }
            }
        }

        if !request.include_cold {
            merged.retain(|_, (fact, _, _)| fact.tier != Tier::Cold);
        }

        if request.graph_expansion {
            let ids: Vec<Uuid> = merged.keys().copied().collect();
            if !ids.is_empty() {
                let expanded = self.graph.connected(&ids, request.graph_max_depth).await?;
                for id in expanded.into_iter().take(request.limit) {
                    if !merged.contains_key(&id) {
                        if let Some(fact) = self.fetch_visible(id, request, as_of).await? {
                            merged.insert(id, (fact, crate::constants::GRAPH_EXPANSION_SCORE, "graph"));
                        }
                    }
                }
            }
        }

        let mut candidates: Vec<RankedCandidate> = merged
            .into_values()
            .map(|(fact, base_score, backend)| {
                let mut score = base_score;
                if request.prefer_long_term {
                    score *= prefer_long_term_boost(&fact);
                }
                if request.use_importance_recency {
                    score *= importance_recency_boost(&fact);
                }
                score *= access_count_boost(fact.recall_count);
                RankedCandidate {
                    fact,
                    score,
                    backend,
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.fact.source_date.cmp(&a.fact.source_date))
                .then_with(|| b.fact.created_at.cmp(&a.fact.created_at))
        });

        let candidate_count = candidates.len();
        candidates.truncate(request.limit.max(1) * 3);

        let block = pack(
            &candidates,
            request.format,
            request.max_tokens,
            request.progressive_pinned_recall_count,
        );

        let block = if request.summarize_when_over_budget && block.included_ids.len() < candidates.len()
        {
            self.summarize_over_budget(request.format, &candidates, block).await
        } else {
            block
        };

        self.facts.refresh_accessed(&block.included_ids).await?;
        for i in 0..block.included_ids.len() {
            for j in (i + 1)..block.included_ids.len() {
                self.graph
                    .strengthen_related(block.included_ids[i], block.included_ids[j])
                    .await?;
            }
        }

        debug!(candidate_count, packed = block.included_ids.len(), "recall complete");
        Ok(RecallResult {
            block,
            candidate_count,
        })
    }

    /// Replace a truncated `full`/`short`/`minimal` body with a 2-3 sentence
    /// LLM summary of the full candidate list (§4.8 step 9). Progressive
    /// formats are left untouched — they budget by showing an index rather
    /// than dropping bullets. Falls back to the already-truncated `block`
    /// when no chat provider is configured or the call fails.
    async fn summarize_over_budget(
        &self,
        format: InjectionFormat,
        candidates: &[RankedCandidate],
        truncated: PackedBlock,
    ) -> PackedBlock {
        if !matches!(
            format,
            InjectionFormat::Full | InjectionFormat::Short | InjectionFormat::Minimal
        ) {
            return truncated;
        }
        let Some(chat) = &self.chat else {
            return truncated;
        };

        let bullet_list = render_full_bullet_list(candidates);
        let prompt = format!(
            "Summarise the following memories in 2-3 sentences, preserving the \
             most important facts:\n{bullet_list}"
        );
        match chat.complete("recall-summary", &prompt, 0.2, 200).await {
            Ok(summary) => PackedBlock {
                text: summary,
                included_ids: candidates.iter().map(|c| c.fact.id).collect(),
                positions: HashMap::new(),
            },
            Err(e) => {
                warn!(error = %e, "over-budget summarisation failed, falling back to truncated packing");
                truncated
            }
        }
    }

    async fn fetch_visible(
        &self,
        id: Uuid,
        request: &RecallRequest,
        as_of: DateTime<Utc>,
    ) -> Result<Option<Fact>> {
        let Some(fact) = self
            .kv
            .get(
                id,
                GetOptions {
                    as_of: Some(as_of),
                    scope_filter: request.scope_filter.clone(),
                },
            )
            .await?
        else {
            return Ok(None);
        };

        if !request.include_superseded && fact.superseded_at.is_some() {
            return Ok(None);
        }
        if !fact.valid_at(as_of) {
            return Ok(None);
        }
        if let Some(scope_filter) = &request.scope_filter {
            if !fact.scope.visible_to(Some(scope_filter)) {
                return Ok(None);
            }
        }
        Ok(Some(fact))
    }

    async fn add_vector_candidates(
        &self,
        request: &RecallRequest,
        as_of: DateTime<Utc>,
        merged: &mut HashMap<Uuid, (Fact, f64, &'static str)>,
    ) -> Result<()> {
        let Some(embedder) = &self.embedder else {
            return Ok(());
        };

        let mut expanded_query = request.query.clone();
        if let Some(chat) = &self.chat {
            match chat
                .complete(
                    "hypothetical-answer",
                    &format!("Write a 1-2 sentence hypothetical answer to: {}", request.query),
                    0.3,
                    80,
                )
                .await
            {
                Ok(answer) => expanded_query = format!("{} {}", request.query, answer),
                Err(e) => warn!(error = %e, "hypothetical-answer expansion failed, using raw query"),
            }
        }

        let vector = embedder.embed(&expanded_query).await?;
        let hits = self
            .vectors
            .search(&vector, request.limit * 2, request.min_score)
            .await?;

        for hit in hits {
            if merged.contains_key(&hit.id) {
                continue;
            }
            if let Some(fact) = self.fetch_visible(hit.id, request, as_of).await? {
                let salience = dynamic_salience(&fact);
                let score = f64::from(hit.cosine) * salience;
                merged.insert(hit.id, (fact, score, "vector"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_request_matches_documented_defaults() {
        let req = RecallRequest::default();
        assert_eq!(req.limit, 10);
        assert!(req.prefer_long_term);
        assert!(req.use_importance_recency);
        assert_eq!(req.graph_max_depth, 2);
    }
}
