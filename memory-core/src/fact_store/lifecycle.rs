use chrono::Utc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::constants::PROMOTION_CONFIDENCE;
use crate::storage::GetOptions;
use crate::types::{Category, FactPatch};
use crate::{Error, Result};

use super::FactStore;

impl FactStore {
    /// Hard-delete current facts whose `expires_at` has passed, removing
    /// their vector row as well. Returns the number pruned.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    #[instrument(skip(self))]
    pub async fn prune_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut pruned = 0u64;
        for fact in self.kv.list_current().await? {
            let Some(expires_at) = fact.expires_at else {
                continue;
            };
            if expires_at < now {
                self.kv.delete(fact.id).await?;
                self.vectors.delete(fact.id).await?;
                pruned += 1;
            }
        }
        debug!(pruned, "prune_expired complete");
        Ok(pruned)
    }

    /// Reduce confidence for facts untouched longer than their decay class's
    /// half-life. The continuous decay curve is implementation-defined; this
    /// applies a fixed fractional reduction per call, floored at `0.05`, and
    /// never re-raises confidence (monotone non-increasing outside
    /// reinforcement). Returns the number of facts decayed.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    #[instrument(skip(self))]
    pub async fn decay_confidence(&self) -> Result<u64> {
        let now = Utc::now();
        let mut decayed = 0u64;
        for fact in self.kv.list_current().await? {
            let Some(half_life) = crate::constants::decay_class_ttl(fact.decay_class) else {
                continue;
            };
            let half_life = half_life / 2;
            let untouched = now.signed_duration_since(fact.last_accessed_at);
            let half_life =
                chrono::Duration::from_std(half_life).unwrap_or(chrono::Duration::zero());
            if untouched <= half_life {
                continue;
            }
            let new_confidence = (fact.confidence * 0.9).max(0.05);
            if (new_confidence - fact.confidence).abs() < f64::EPSILON {
                continue;
            }
            self.kv
                .update(
                    fact.id,
                    FactPatch {
                        confidence: Some(new_confidence),
                        ..Default::default()
                    },
                )
                .await?;
            decayed += 1;
        }
        debug!(decayed, "decay_confidence complete");
        Ok(decayed)
    }

    /// Daily auto-classification pass (§4.10): for each current fact still
    /// labelled `other`, ask the classification LLM to propose a better
    /// category and, when it names one, register it in the category registry
    /// and patch the fact. Whether this routine belongs in the core or an
    /// offline job is an open question the spec leaves unresolved; this
    /// engine runs it in-core but tolerates a category name appearing on disk
    /// from an external job between runs regardless. Returns the number of
    /// facts reclassified.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure. Individual classification
    /// failures are logged and the fact is left as `other`.
    #[instrument(skip(self))]
    pub async fn auto_classify_uncategorized(&self) -> Result<u64> {
        let Some(chat) = &self.chat else {
            return Ok(0);
        };

        let mut reclassified = 0u64;
        for fact in self.kv.list_current().await? {
            if fact.category != Category::Other("other".to_string()) {
                continue;
            }

            let prompt = format!(
                "Classify the following note into a single short lowercase category \
                 word (e.g. preference, fact, decision, entity, pattern, rule, or a new \
                 word if none fit). Respond with only the category word.\n\nNote: {}",
                fact.text
            );
            let label = match chat.complete("classify-category", &prompt, 0.0, 8).await {
                Ok(text) => text.trim().to_lowercase(),
                Err(e) => {
                    warn!(fact_id = %fact.id, error = %e, "auto-classification call failed, leaving as other");
                    continue;
                }
            };
            if label.is_empty() || label == "other" {
                continue;
            }

            let category = Category::parse(&label);
            if !category.is_builtin() {
                self.categories.register(category.label())?;
            }
            self.kv
                .update(
                    fact.id,
                    FactPatch {
                        category: Some(category),
                        ..Default::default()
                    },
                )
                .await?;
            reclassified += 1;
        }
        debug!(reclassified, "auto_classify_uncategorized complete");
        Ok(reclassified)
    }

    /// Append a reinforcement quote (truncated, capped at 10), bump the
    /// reinforcement counter, and promote confidence to at least `0.8` once
    /// the counter reaches the configured threshold, if not already promoted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `id` does not exist.
    #[instrument(skip(self, quote))]
    pub async fn reinforce_fact(&self, id: Uuid, quote: &str) -> Result<()> {
        let mut fact = self
            .kv
            .get(id, GetOptions::default())
            .await?
            .ok_or(Error::NotFound(id))?;

        fact.push_reinforcement_quote(quote);
        let reinforced_count = fact.reinforced_count + 1;
        let now = Utc::now();

        let mut patch = FactPatch {
            reinforced_count: Some(reinforced_count),
            reinforced_quotes: Some(fact.reinforced_quotes.clone()),
            last_reinforced_at: Some(now),
            ..Default::default()
        };

        let threshold = self.config.store.promotion_threshold;
        if fact.promoted_at.is_none()
            && reinforced_count >= threshold
            && fact.confidence < PROMOTION_CONFIDENCE
        {
            patch.confidence = Some(PROMOTION_CONFIDENCE);
            patch.promoted_at = Some(Some(now));
        }

        self.kv.update(id, patch).await
    }

    /// Bump `recall_count` and `last_accessed_at` for every id in `ids`. Used
    /// by the retrieval pipeline's feedback step.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure; missing ids are skipped.
    pub async fn refresh_accessed(&self, ids: &[Uuid]) -> Result<()> {
        let now = Utc::now();
        for &id in ids {
            let Some(fact) = self.kv.get(id, GetOptions::default()).await? else {
                continue;
            };
            self.kv
                .update(
                    id,
                    FactPatch {
                        recall_count: Some(fact.recall_count + 1),
                        last_accessed_at: Some(now),
                        ..Default::default()
                    },
                )
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Exercised end-to-end in the `memory-e2e-tests` crate against a real
    // `KeyValueIndex`; the idempotent-reinforcement and monotone-decay
    // properties need real storage and are covered there.
}
