use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::constants::CHARS_PER_TOKEN_ESTIMATE;
use crate::types::{Fact, InjectionFormat};

/// Estimate the token cost of `text` at ~4 chars/token.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    ((text.chars().count() as f64) / CHARS_PER_TOKEN_ESTIMATE).ceil() as usize
}

/// A ranked candidate ready for packing.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    /// The candidate fact.
    pub fact: Fact,
    /// The composed relevance score.
    pub score: f64,
    /// Which retrieval path produced this candidate, e.g. `"fts"` or `"vector"`.
    pub backend: &'static str,
}

/// The packed output of a recall call: the formatted block plus the ids that
/// survived packing (for access-boost feedback) and, for progressive
/// formats, the position→id map.
#[derive(Debug, Clone)]
pub struct PackedBlock {
    /// The formatted `<relevant-memories>`-ready text.
    pub text: String,
    /// Ids of facts that made it into the block, for `refresh_accessed` and
    /// Hebbian-strengthening feedback.
    pub included_ids: Vec<Uuid>,
    /// Position → id map for progressive formats; empty for the others.
    pub positions: HashMap<u32, Uuid>,
}

/// Per-adapter cache of the last progressive index shown, so a later `recall`
/// call with `id: <position>` can resolve it. Not persisted; replaced on
/// every recall.
#[derive(Debug, Default)]
pub struct ProgressiveIndexCache {
    positions: RwLock<HashMap<u32, Uuid>>,
}

impl ProgressiveIndexCache {
    /// Construct an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached position map.
    pub fn replace(&self, positions: HashMap<u32, Uuid>) {
        *self.positions.write() = positions;
    }

    /// Resolve a cached position to its fact id.
    #[must_use]
    pub fn resolve(&self, position: u32) -> Option<Uuid> {
        self.positions.read().get(&position).copied()
    }
}

/// Pack ranked candidates into the requested output format under `max_tokens`.
#[must_use]
pub fn pack(
    candidates: &[RankedCandidate],
    format: InjectionFormat,
    max_tokens: usize,
    pinned_recall_count: u64,
) -> PackedBlock {
    match format {
        InjectionFormat::Full => pack_lines(candidates, max_tokens, line_full),
        InjectionFormat::Short => pack_lines(candidates, max_tokens, line_short),
        InjectionFormat::Minimal => pack_lines(candidates, max_tokens, line_minimal),
        InjectionFormat::Progressive => pack_progressive(candidates, max_tokens),
        InjectionFormat::ProgressiveHybrid => {
            pack_progressive_hybrid(candidates, max_tokens, pinned_recall_count)
        }
    }
}

/// Render every candidate as a `full`-format bullet line, for feeding to an
/// LLM summariser when packing must drop results over budget (§4.8 step 9).
#[must_use]
pub fn render_full_bullet_list(candidates: &[RankedCandidate]) -> String {
    candidates.iter().map(line_full).collect::<Vec<_>>().join("\n")
}

fn line_full(c: &RankedCandidate) -> String {
    format!(
        "- [{}/{}] {}",
        c.backend,
        c.fact.category.label(),
        c.fact.display_text()
    )
}

fn line_short(c: &RankedCandidate) -> String {
    format!("- {}: {}", c.fact.category.label(), c.fact.display_text())
}

fn line_minimal(c: &RankedCandidate) -> String {
    format!("- {}", c.fact.display_text())
}

fn pack_lines(
    candidates: &[RankedCandidate],
    max_tokens: usize,
    render: fn(&RankedCandidate) -> String,
) -> PackedBlock {
    let mut lines = Vec::new();
    let mut included_ids = Vec::new();
    let mut budget_used = 0usize;

    for candidate in candidates {
        let line = render(candidate);
        let cost = estimate_tokens(&line);
        if budget_used + cost > max_tokens && !lines.is_empty() {
            break;
        }
        budget_used += cost;
        included_ids.push(candidate.fact.id);
        lines.push(line);
    }

    PackedBlock {
        text: lines.join("\n"),
        included_ids,
        positions: HashMap::new(),
    }
}

fn pack_progressive(candidates: &[RankedCandidate], max_tokens: usize) -> PackedBlock {
    let mut lines = Vec::new();
    let mut positions = HashMap::new();
    let mut included_ids = Vec::new();
    let mut budget_used = 0usize;
    let mut position = 1u32;

    for candidate in candidates {
        let title = progressive_title(&candidate.fact);
        let cost = estimate_tokens(&title) + 2;
        if budget_used + cost > max_tokens && !lines.is_empty() {
            break;
        }
        budget_used += cost;
        lines.push(format!(
            "{position}. [{}] {title} (~{cost} tok)",
            candidate.fact.category.label()
        ));
        positions.insert(position, candidate.fact.id);
        included_ids.push(candidate.fact.id);
        position += 1;
    }

    PackedBlock {
        text: lines.join("\n"),
        included_ids,
        positions,
    }
}

fn pack_progressive_hybrid(
    candidates: &[RankedCandidate],
    max_tokens: usize,
    pinned_recall_count: u64,
) -> PackedBlock {
    let pinned_budget = (max_tokens as f64 * 0.6) as usize;

    let (pinned, rest): (Vec<_>, Vec<_>) = candidates.iter().partition(|c| {
        matches!(c.fact.decay_class, crate::types::DecayClass::Permanent)
            || c.fact.recall_count >= pinned_recall_count
    });

    let pinned_refs: Vec<RankedCandidate> = pinned.into_iter().cloned().collect();
    let mut full_block = pack_lines(&pinned_refs, pinned_budget, line_full);

    let remaining_budget = max_tokens.saturating_sub(estimate_tokens(&full_block.text));
    let rest_refs: Vec<RankedCandidate> = rest.into_iter().cloned().collect();
    let progressive_block = pack_progressive(&rest_refs, remaining_budget);

    let mut text = full_block.text.clone();
    if !progressive_block.text.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&progressive_block.text);
    }

    full_block.included_ids.extend(progressive_block.included_ids);
    PackedBlock {
        text,
        included_ids: full_block.included_ids,
        positions: progressive_block.positions,
    }
}

/// Render hot-tier facts for the adapter's `<hot-memories>` section, budgeted
/// by `max_tokens` and capped at `max_facts`. Facts must already be ordered by
/// priority (e.g. `FactStore::list_hot`'s `last_accessed_at`/`importance`
/// ordering); this function only truncates, it does not re-sort.
#[must_use]
pub fn pack_hot(facts: &[Fact], max_tokens: usize, max_facts: usize) -> PackedBlock {
    let mut lines = Vec::new();
    let mut included_ids = Vec::new();
    let mut budget_used = 0usize;

    for fact in facts.iter().take(max_facts) {
        let line = format!("- [hot/{}] {}", fact.category.label(), fact.display_text());
        let cost = estimate_tokens(&line);
        if budget_used + cost > max_tokens && !lines.is_empty() {
            break;
        }
        budget_used += cost;
        included_ids.push(fact.id);
        lines.push(line);
    }

    PackedBlock {
        text: lines.join("\n"),
        included_ids,
        positions: HashMap::new(),
    }
}

fn progressive_title(fact: &Fact) -> String {
    if let Some(key) = &fact.key {
        key.clone()
    } else {
        fact.display_text().chars().take(60).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, DecayClass, Scope, Tier};
    use chrono::Utc;

    fn candidate(text: &str, score: f64) -> RankedCandidate {
        let now = Utc::now();
        RankedCandidate {
            fact: Fact {
                id: Uuid::new_v4(),
                text: text.to_string(),
                summary: None,
                category: Category::Fact,
                entity: None,
                key: None,
                value: None,
                importance: 0.5,
                confidence: 0.9,
                decay_class: DecayClass::Active,
                tier: Tier::Warm,
                scope: Scope::Global,
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
                hash_normalized: text.to_lowercase(),
                embedding_ref: None,
            },
            score,
            backend: "fts",
        }
    }

    #[test]
    fn full_format_renders_backend_and_category() {
        let candidates = vec![candidate("User prefers dark mode", 1.0)];
        let block = pack(&candidates, InjectionFormat::Full, 100, 5);
        assert_eq!(block.text, "- [fts/fact] User prefers dark mode");
    }

    #[test]
    fn progressive_format_assigns_sequential_positions() {
        let candidates = vec![candidate("first fact here", 1.0), candidate("second fact here", 0.9)];
        let block = pack(&candidates, InjectionFormat::Progressive, 1000, 5);
        assert_eq!(block.positions.len(), 2);
        assert!(block.positions.contains_key(&1));
        assert!(block.positions.contains_key(&2));
    }

    #[test]
    fn pack_lines_always_includes_at_least_one_candidate_when_nonempty() {
        let candidates = vec![candidate("x".repeat(2000).as_str(), 1.0)];
        let block = pack(&candidates, InjectionFormat::Minimal, 1, 5);
        assert_eq!(block.included_ids.len(), 1);
    }

    #[test]
    fn progressive_index_cache_resolves_last_replace() {
        let cache = ProgressiveIndexCache::new();
        let id = Uuid::new_v4();
        let mut map = HashMap::new();
        map.insert(1, id);
        cache.replace(map);
        assert_eq!(cache.resolve(1), Some(id));
        assert_eq!(cache.resolve(2), None);
    }
}
