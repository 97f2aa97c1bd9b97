use chrono::Utc;

use crate::constants::prefer_long_term_factor;
use crate::types::{DecayClass, Fact};

/// `importance_factor` component of the vector-candidate dynamic-salience
/// multiplier: linear in importance, floored so a zero-importance fact is not
/// zeroed out entirely.
#[must_use]
pub fn importance_factor(importance: f64) -> f64 {
    0.5 + 0.5 * importance.clamp(0.0, 1.0)
}

/// `recency_factor` component of the dynamic-salience multiplier: decays
/// toward `0.5` over 90 days since last confirmation.
#[must_use]
pub fn recency_factor(last_confirmed_at: chrono::DateTime<Utc>) -> f64 {
    let age_days = Utc::now()
        .signed_duration_since(last_confirmed_at)
        .num_days()
        .max(0) as f64;
    (1.0 - (age_days / 90.0).min(1.0) * 0.5).max(0.5)
}

/// `decay_class_factor` component of the dynamic-salience multiplier:
/// longer-lived classes are trusted slightly more in vector ranking.
#[must_use]
pub fn decay_class_factor(decay_class: DecayClass) -> f64 {
    match decay_class {
        DecayClass::Permanent => 1.1,
        DecayClass::Stable => 1.05,
        DecayClass::Active => 1.0,
        DecayClass::Session => 0.9,
        DecayClass::Checkpoint => 0.8,
    }
}

/// The full dynamic-salience multiplier applied to a vector-candidate's
/// cosine score.
#[must_use]
pub fn dynamic_salience(fact: &Fact) -> f64 {
    importance_factor(fact.importance)
        * recency_factor(fact.last_confirmed_at)
        * decay_class_factor(fact.decay_class)
}

/// `useImportanceRecency` boost: `(0.7 + 0.3*importance) * (0.8 + 0.2*max(0, 1 - age/90d))`.
#[must_use]
pub fn importance_recency_boost(fact: &Fact) -> f64 {
    let age_days = Utc::now()
        .signed_duration_since(fact.created_at)
        .num_days()
        .max(0) as f64;
    let recency_term = (1.0 - age_days / 90.0).max(0.0);
    (0.7 + 0.3 * fact.importance.clamp(0.0, 1.0)) * (0.8 + 0.2 * recency_term)
}

/// Access-count boost: `1 + 0.1 * ln(recall_count + 1)`.
#[must_use]
pub fn access_count_boost(recall_count: u64) -> f64 {
    1.0 + 0.1 * ((recall_count as f64) + 1.0).ln()
}

/// `preferLongTerm` boost for a fact's decay class.
#[must_use]
pub fn prefer_long_term_boost(fact: &Fact) -> f64 {
    prefer_long_term_factor(fact.decay_class)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn importance_factor_is_monotone() {
        assert!(importance_factor(1.0) > importance_factor(0.0));
    }

    #[test]
    fn access_count_boost_grows_with_recall_count() {
        assert!(access_count_boost(10) > access_count_boost(0));
    }

    #[test]
    fn decay_class_factor_orders_permanent_highest() {
        assert!(decay_class_factor(DecayClass::Permanent) > decay_class_factor(DecayClass::Checkpoint));
    }
}
