//! Parallel store for tool-call recipes with reinforcement and promotion;
//! shares the `KeyValueIndex` with the fact store.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::constants::PROMOTION_CONFIDENCE;
use crate::storage::KeyValueIndex;
use crate::types::{Procedure, ProcedureType};
use crate::{Error, Result};

/// Operations on learned tool-call procedures.
pub struct ProcedureStore {
    kv: Arc<dyn KeyValueIndex>,
    promotion_threshold: u32,
}

impl ProcedureStore {
    /// Construct a `ProcedureStore` over the given `KeyValueIndex`.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueIndex>, promotion_threshold: u32) -> Self {
        Self {
            kv,
            promotion_threshold,
        }
    }

    /// Insert a new procedure.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn insert(&self, procedure: Procedure) -> Result<Uuid> {
        self.kv.insert_procedure(procedure).await
    }

    /// Append a reinforcement quote (truncated, capped at 10), bump the
    /// reinforcement counter, and promote confidence to at least `0.8` once
    /// the counter reaches the threshold, if not already promoted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `id` does not exist.
    pub async fn reinforce_procedure(&self, id: Uuid, quote: &str) -> Result<()> {
        let mut procedure = self
            .kv
            .get_procedure(id)
            .await?
            .ok_or(Error::NotFound(id))?;

        procedure.push_reinforcement_quote(quote);
        procedure.reinforced_count += 1;
        procedure.last_reinforced_at = Some(Utc::now());

        if procedure.promoted_at.is_none()
            && procedure.reinforced_count >= self.promotion_threshold
            && procedure.confidence < PROMOTION_CONFIDENCE
        {
            procedure.confidence = PROMOTION_CONFIDENCE;
            procedure.promoted_at = Some(Utc::now());
        }

        self.kv.put_procedure(procedure).await
    }

    /// Search positive procedures matching `task` (a simple fuzzy match
    /// against `task_pattern`), ranked by `(procedure_type desc, confidence +
    /// reinforce_boost, last_validated desc)`.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn search(&self, task: &str, k: usize, reinforce_boost: f64) -> Result<Vec<Procedure>> {
        let mut candidates: Vec<Procedure> = self
            .kv
            .list_procedures()
            .await?
            .into_iter()
            .filter(|p| p.procedure_type == ProcedureType::Positive)
            .filter(|p| matches(task, &p.task_pattern))
            .collect();

        candidates.sort_by(|a, b| rank_cmp(a, b, reinforce_boost));
        candidates.truncate(k);
        Ok(candidates)
    }

    /// Return negative (known-failure) procedures matching `task`, surfaced
    /// as warnings rather than executed.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn get_negative_matching(&self, task: &str, k: usize) -> Result<Vec<Procedure>> {
        let mut candidates: Vec<Procedure> = self
            .kv
            .list_procedures()
            .await?
            .into_iter()
            .filter(|p| p.procedure_type == ProcedureType::Negative)
            .filter(|p| matches(task, &p.task_pattern))
            .collect();

        candidates.sort_by(|a, b| rank_cmp(a, b, 0.0));
        candidates.truncate(k);
        Ok(candidates)
    }
}

fn matches(task: &str, pattern: &str) -> bool {
    let task = task.to_lowercase();
    let pattern = pattern.to_lowercase();
    task.contains(&pattern) || pattern.contains(&task) || crate::extraction::fuzzy_similarity(&task, &pattern) > 0.5
}

fn rank_cmp(a: &Procedure, b: &Procedure, reinforce_boost: f64) -> Ordering {
    let (a_type, a_score, a_time) = a.rank_key(reinforce_boost);
    let (b_type, b_score, b_time) = b.rank_key(reinforce_boost);
    b_type
        .cmp(&a_type)
        .then(b_score.partial_cmp(&a_score).unwrap_or(Ordering::Equal))
        .then(b_time.cmp(&a_time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_is_substring_or_fuzzy() {
        assert!(matches("deploy the service", "deploy"));
        assert!(matches("deply servic", "deploy service"));
        assert!(!matches("unrelated task entirely", "xyz123"));
    }
}
