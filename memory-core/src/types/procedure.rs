use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{REINFORCEMENT_QUOTES_MAX_COUNT, REINFORCEMENT_QUOTE_MAX_CHARS};

/// Whether a procedure is a recommended recipe or a known-failure to avoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcedureType {
    /// A recipe that has worked before.
    Positive,
    /// A recipe that is known to fail; surfaced as a warning, never executed.
    Negative,
}

/// A single tool invocation within a procedure's recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureStep {
    /// The tool name.
    pub tool: String,
    /// Optional arguments, stored as opaque JSON.
    pub args: Option<serde_json::Value>,
}

/// A learned recipe of tool-call steps for a recurring task pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Procedure {
    /// Globally unique identifier.
    pub id: Uuid,
    /// The task description or pattern this procedure matches.
    pub task_pattern: String,
    /// The ordered recipe of tool-call steps.
    pub recipe: Vec<ProcedureStep>,
    /// Positive or negative.
    pub procedure_type: ProcedureType,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Number of times this procedure succeeded when applied.
    pub success_count: u64,
    /// Number of times this procedure failed when applied.
    pub failure_count: u64,
    /// Last time this procedure was validated against a real task.
    pub last_validated_at: DateTime<Utc>,
    /// Number of times a caller has reinforced this procedure.
    pub reinforced_count: u32,
    /// Up to 10 reinforcement quotes, each truncated to 200 chars.
    pub reinforced_quotes: Vec<String>,
    /// When this procedure was last reinforced.
    pub last_reinforced_at: Option<DateTime<Utc>>,
    /// When this procedure's confidence was promoted by reinforcement.
    pub promoted_at: Option<DateTime<Utc>>,
    /// Free-text provenance.
    pub source: String,
}

impl Procedure {
    /// Append a reinforcement quote, truncating and capping as facts do.
    pub fn push_reinforcement_quote(&mut self, quote: &str) {
        let truncated: String = quote.chars().take(REINFORCEMENT_QUOTE_MAX_CHARS).collect();
        self.reinforced_quotes.push(truncated);
        if self.reinforced_quotes.len() > REINFORCEMENT_QUOTES_MAX_COUNT {
            let overflow = self.reinforced_quotes.len() - REINFORCEMENT_QUOTES_MAX_COUNT;
            self.reinforced_quotes.drain(0..overflow);
        }
    }

    /// Ranking key used by `ProcedureStore::search`: positive recipes first,
    /// then by (confidence + boost if reinforced), then by recency.
    #[must_use]
    pub fn rank_key(&self, reinforce_boost: f64) -> (bool, f64, DateTime<Utc>) {
        let type_rank = matches!(self.procedure_type, ProcedureType::Positive);
        let boosted_confidence = self.confidence
            + if self.reinforced_count > 0 {
                reinforce_boost
            } else {
                0.0
            };
        (type_rank, boosted_confidence, self.last_validated_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(procedure_type: ProcedureType) -> Procedure {
        Procedure {
            id: Uuid::new_v4(),
            task_pattern: "deploy service".to_string(),
            recipe: vec![ProcedureStep {
                tool: "kubectl apply".to_string(),
                args: None,
            }],
            procedure_type,
            confidence: 0.6,
            success_count: 1,
            failure_count: 0,
            last_validated_at: Utc::now(),
            reinforced_count: 0,
            reinforced_quotes: vec![],
            last_reinforced_at: None,
            promoted_at: None,
            source: "test".to_string(),
        }
    }

    #[test]
    fn positive_ranks_above_negative_regardless_of_confidence() {
        let positive = sample(ProcedureType::Positive);
        let mut negative = sample(ProcedureType::Negative);
        negative.confidence = 0.95;
        assert!(positive.rank_key(0.0).0 && !negative.rank_key(0.0).0);
    }

    #[test]
    fn reinforced_procedures_get_the_boost_in_rank_key() {
        let mut p = sample(ProcedureType::Positive);
        p.reinforced_count = 1;
        let (_, boosted, _) = p.rank_key(0.2);
        assert!((boosted - 0.8).abs() < 1e-9);
    }
}
