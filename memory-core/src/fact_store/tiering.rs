use chrono::Utc;
use tracing::{debug, instrument};

use crate::constants::HOT_IMPORTANCE_THRESHOLD;
use crate::types::{DecayClass, FactPatch, Tier};
use crate::Result;

use super::FactStore;

/// Options controlling a single `tier_compact` pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct TierCompactOptions {
    /// Run even if `memory_tiering.enabled` is false in config.
    pub force: bool,
}

/// Outcome counts from a `tier_compact` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCompactStats {
    /// Facts moved to the cold tier.
    pub moved_to_cold: u64,
    /// Facts moved to the warm tier.
    pub moved_to_warm: u64,
    /// Facts moved to the hot tier.
    pub moved_to_hot: u64,
}

impl FactStore {
    /// Migrate facts between tiers per the compaction rules:
    /// session/checkpoint facts idle over a day move to cold; preferences
    /// idle past `inactive_preference_days` move to warm; active blockers
    /// (importance ≥ 0.8, recently reinforced) move to hot, respecting the
    /// hot caps. A fact is moved at most once per pass (no hot⇄cold
    /// oscillation within a single call).
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    #[instrument(skip(self, opts))]
    pub async fn tier_compact(&self, opts: TierCompactOptions) -> Result<TierCompactStats> {
        if !self.config.memory_tiering.enabled && !opts.force {
            return Ok(TierCompactStats::default());
        }
        let now = Utc::now();
        let mut stats = TierCompactStats::default();
        let mut facts = self.kv.list_current().await?;

        let mut hot_candidates: Vec<_> = facts
            .iter()
            .filter(|f| {
                f.tier != Tier::Hot
                    && f.importance >= HOT_IMPORTANCE_THRESHOLD
                    && f.last_reinforced_at.is_some()
            })
            .map(|f| f.id)
            .collect();

        facts.sort_by(|a, b| {
            b.last_accessed_at
                .cmp(&a.last_accessed_at)
                .then(b.importance.partial_cmp(&a.importance).unwrap_or(std::cmp::Ordering::Equal))
        });

        hot_candidates.truncate(self.config.memory_tiering.hot_max_facts);

        for fact in &facts {
            if fact.tier == Tier::Hot {
                continue;
            }
            let moved_to_cold = matches!(
                fact.decay_class,
                DecayClass::Session | DecayClass::Checkpoint
            ) && now.signed_duration_since(fact.last_accessed_at) > chrono::Duration::days(1);

            let moved_to_warm = fact.category.label() == "preference"
                && fact.tier != Tier::Warm
                && now.signed_duration_since(fact.last_accessed_at)
                    > chrono::Duration::days(self.config.memory_tiering.inactive_preference_days);

            if moved_to_cold {
                self.set_tier(fact.id, Tier::Cold).await?;
                stats.moved_to_cold += 1;
            } else if moved_to_warm {
                self.set_tier(fact.id, Tier::Warm).await?;
                stats.moved_to_warm += 1;
            } else if hot_candidates.contains(&fact.id) {
                self.set_tier(fact.id, Tier::Hot).await?;
                stats.moved_to_hot += 1;
            }
        }

        debug!(
            moved_to_cold = stats.moved_to_cold,
            moved_to_warm = stats.moved_to_warm,
            moved_to_hot = stats.moved_to_hot,
            "tier_compact complete"
        );
        Ok(stats)
    }

    /// List current hot-tier facts, ordered by `last_accessed_at` desc then
    /// `importance` desc, for the adapter's `<hot-memories>` section.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn list_hot(&self) -> Result<Vec<crate::types::Fact>> {
        let mut facts: Vec<_> = self
            .kv
            .list_current()
            .await?
            .into_iter()
            .filter(|f| f.tier == Tier::Hot)
            .collect();
        facts.sort_by(|a, b| {
            b.last_accessed_at
                .cmp(&a.last_accessed_at)
                .then(b.importance.partial_cmp(&a.importance).unwrap_or(std::cmp::Ordering::Equal))
        });
        Ok(facts)
    }

    async fn set_tier(&self, id: uuid::Uuid, tier: Tier) -> Result<()> {
        self.kv
            .update(
                id,
                FactPatch {
                    tier: Some(tier),
                    ..Default::default()
                },
            )
            .await
    }
}
