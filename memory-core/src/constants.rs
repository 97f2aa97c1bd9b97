//! Tunable defaults and hard limits referenced throughout the engine.

use std::time::Duration;

/// Default maximum length of a fact's `text` field, in chars.
pub const DEFAULT_TEXT_MAX_CHARS: usize = 5_000;

/// Maximum length of a single reinforcement quote, in chars.
pub const REINFORCEMENT_QUOTE_MAX_CHARS: usize = 200;

/// Maximum number of reinforcement quotes retained per fact or procedure.
pub const REINFORCEMENT_QUOTES_MAX_COUNT: usize = 10;

/// Reinforcement count at which confidence is promoted to
/// [`PROMOTION_CONFIDENCE`], unless already at or above it.
pub const DEFAULT_PROMOTION_THRESHOLD: u32 = 2;

/// Confidence floor applied on promotion.
pub const PROMOTION_CONFIDENCE: f64 = 0.8;

/// Default busy-timeout for `KeyValueIndex` write-lock contention.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default WAL record max age considered for crash-recovery replay.
pub const DEFAULT_WAL_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// WAL file size, in bytes, past which a compaction pass rewrites it with
/// only the still-pending records.
pub const DEFAULT_WAL_COMPACT_THRESHOLD_BYTES: u64 = 1_000_000;

/// Hard cap on `GraphStore::connected` traversal depth, regardless of config.
pub const MAX_TRAVERSAL_DEPTH: u32 = 3;

/// Default traversal depth used by recall's graph-expansion step.
pub const DEFAULT_TRAVERSAL_DEPTH: u32 = 2;

/// Hebbian strengthening step applied to an existing `RELATED_TO` edge.
pub const HEBBIAN_STRENGTHEN_STEP: f64 = 0.05;

/// Initial strength assigned to a newly created `RELATED_TO` edge.
pub const HEBBIAN_INITIAL_STRENGTH: f64 = 0.5;

/// Fixed score assigned to facts added by recall's graph-expansion step.
pub const GRAPH_EXPANSION_SCORE: f64 = 0.45;

/// Default hot-tier token budget.
pub const DEFAULT_HOT_MAX_TOKENS: usize = 2_000;

/// Default hot-tier fact-count cap.
pub const DEFAULT_HOT_MAX_FACTS: usize = 50;

/// Default number of days of inactivity after which a preference demotes to warm.
pub const DEFAULT_INACTIVE_PREFERENCE_DAYS: i64 = 7;

/// Importance threshold above which a recently-reinforced fact is promoted to hot.
pub const HOT_IMPORTANCE_THRESHOLD: f64 = 0.8;

/// Approximate characters per token used for budget estimation.
pub const CHARS_PER_TOKEN_ESTIMATE: f64 = 4.0;

/// `FactStore::store_with_classification`'s default neighbour count fetched for classification.
pub const CLASSIFICATION_NEIGHBOUR_COUNT: usize = 5;

/// Multiplier applied to a fact's composed score when `prefer_long_term` is enabled.
#[must_use]
pub fn prefer_long_term_factor(decay_class: crate::types::DecayClass) -> f64 {
    use crate::types::DecayClass::{Permanent, Stable};
    match decay_class {
        Permanent => 1.2,
        Stable => 1.1,
        _ => 1.0,
    }
}

/// TTL associated with each decay class. `None` means the fact never expires.
#[must_use]
pub fn decay_class_ttl(decay_class: crate::types::DecayClass) -> Option<Duration> {
    use crate::types::DecayClass::{Active, Checkpoint, Permanent, Session, Stable};
    match decay_class {
        Permanent => None,
        Stable => Some(Duration::from_secs(90 * 24 * 3600)),
        Active => Some(Duration::from_secs(14 * 24 * 3600)),
        Session => Some(Duration::from_secs(24 * 3600)),
        Checkpoint => Some(Duration::from_secs(4 * 3600)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DecayClass;

    #[test]
    fn ttls_match_the_documented_buckets() {
        assert_eq!(decay_class_ttl(DecayClass::Permanent), None);
        assert_eq!(
            decay_class_ttl(DecayClass::Stable),
            Some(Duration::from_secs(90 * 24 * 3600))
        );
        assert_eq!(
            decay_class_ttl(DecayClass::Checkpoint),
            Some(Duration::from_secs(4 * 3600))
        );
    }

    #[test]
    fn long_term_factor_orders_permanent_over_stable_over_rest() {
        assert!(
            prefer_long_term_factor(DecayClass::Permanent)
                > prefer_long_term_factor(DecayClass::Stable)
        );
        assert!(
            prefer_long_term_factor(DecayClass::Stable)
                > prefer_long_term_factor(DecayClass::Session)
        );
    }
}
