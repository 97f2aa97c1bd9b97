use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{REINFORCEMENT_QUOTES_MAX_COUNT, REINFORCEMENT_QUOTE_MAX_CHARS};

/// A fact's category. The built-in set is open: unrecognised values round-trip
/// as [`Category::Other`] carrying the original label, and the lifecycle
/// scheduler's auto-classification pass may register new ones via the
/// category registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// A stated user preference.
    Preference,
    /// A general fact about the user, agent, or world.
    Fact,
    /// A decision that was made and should be remembered.
    Decision,
    /// A named entity and its attributes.
    Entity,
    /// An observed recurring pattern.
    Pattern,
    /// A rule the agent should follow.
    Rule,
    /// Any category outside the built-in set, named explicitly.
    Other(String),
}

impl Category {
    /// The on-disk/display label for this category.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Category::Preference => "preference",
            Category::Fact => "fact",
            Category::Decision => "decision",
            Category::Entity => "entity",
            Category::Pattern => "pattern",
            Category::Rule => "rule",
            Category::Other(label) => label,
        }
    }

    /// Parse a category label, falling back to [`Category::Other`] for
    /// anything outside the built-in set.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label {
            "preference" => Category::Preference,
            "fact" => Category::Fact,
            "decision" => Category::Decision,
            "entity" => Category::Entity,
            "pattern" => Category::Pattern,
            "rule" => Category::Rule,
            other => Category::Other(other.to_string()),
        }
    }

    /// Whether this category is one of the six built-in labels.
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Category::Other(_))
    }
}

/// Qualitative lifetime bucket determining a fact's default `expires_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayClass {
    /// Never expires.
    Permanent,
    /// 90-day TTL.
    Stable,
    /// 14-day TTL.
    Active,
    /// 24-hour TTL.
    Session,
    /// 4-hour TTL.
    Checkpoint,
}

/// Runtime tier controlling what is injected by default during recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Always considered first, budgeted separately from the main recall pass.
    Hot,
    /// The default tier, included in ordinary recall.
    Warm,
    /// Excluded from recall unless `include_cold` is set.
    Cold,
}

/// Visibility scope of a fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    /// Visible to every user, agent, and session.
    Global,
    /// Visible only within a given user.
    User {
        /// The user id this fact is scoped to.
        target: String,
    },
    /// Visible only within a given agent.
    Agent {
        /// The agent id this fact is scoped to.
        target: String,
    },
    /// Visible only within a given session.
    Session {
        /// The session id this fact is scoped to.
        target: String,
    },
}

impl Scope {
    /// The scope target, if this scope is non-global.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Scope::Global => None,
            Scope::User { target } | Scope::Agent { target } | Scope::Session { target } => {
                Some(target)
            }
        }
    }

    /// Whether `self` covers a read made with `viewer`: global facts are
    /// always visible; scoped facts require a matching viewer target.
    #[must_use]
    pub fn visible_to(&self, viewer: Option<&Scope>) -> bool {
        match self {
            Scope::Global => true,
            scoped => match viewer {
                None => false,
                Some(v) => {
                    std::mem::discriminant(scoped) == std::mem::discriminant(v)
                        && scoped.target() == v.target()
                }
            },
        }
    }
}

/// The unit of stored knowledge in the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    /// Globally unique identifier.
    pub id: Uuid,
    /// Fact body, truncated to `capture_max_chars` on store.
    pub text: String,
    /// Optional short form used for injection when `text` exceeds a threshold.
    pub summary: Option<String>,
    /// Category label from the open set.
    pub category: Category,
    /// Structured triple: subject entity.
    pub entity: Option<String>,
    /// Structured triple: attribute key.
    pub key: Option<String>,
    /// Structured triple: attribute value (or a `vault:<service>` pointer).
    pub value: Option<String>,
    /// Caller-declared or heuristically estimated importance, in `[0, 1]`.
    pub importance: f64,
    /// Confidence that decays over time, in `[0, 1]`.
    pub confidence: f64,
    /// Lifetime bucket.
    pub decay_class: DecayClass,
    /// Runtime tier.
    pub tier: Tier,
    /// Visibility scope.
    pub scope: Scope,
    /// Free-text provenance, e.g. `"session-capture"` or `"user-explicit"`.
    pub source: String,
    /// When the source asserted this fact, if different from `created_at`.
    pub source_date: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last time a caller re-asserted this fact unchanged.
    pub last_confirmed_at: DateTime<Utc>,
    /// Last time this fact was returned by recall.
    pub last_accessed_at: DateTime<Utc>,
    /// Expiry derived from `decay_class`, or `None` for permanent facts.
    pub expires_at: Option<DateTime<Utc>>,
    /// Lower-case free-text tags.
    pub tags: Vec<String>,
    /// Number of times this fact has been returned by recall.
    pub recall_count: u64,
    /// Number of times a caller has reinforced this fact.
    pub reinforced_count: u32,
    /// Up to 10 reinforcement quotes, each truncated to 200 chars.
    pub reinforced_quotes: Vec<String>,
    /// When this fact was last reinforced.
    pub last_reinforced_at: Option<DateTime<Utc>>,
    /// When this fact's confidence was promoted by reinforcement, set at most once.
    pub promoted_at: Option<DateTime<Utc>>,
    /// The fact this one supersedes, if any.
    pub supersedes_id: Option<Uuid>,
    /// The fact that supersedes this one, if any.
    pub superseded_by_id: Option<Uuid>,
    /// When this fact was superseded.
    pub superseded_at: Option<DateTime<Utc>>,
    /// Start of this fact's validity interval.
    pub valid_from: DateTime<Utc>,
    /// End of this fact's validity interval, if superseded.
    pub valid_to: Option<DateTime<Utc>>,
    /// Normalised hash used for fuzzy duplicate detection.
    pub hash_normalized: String,
    /// Pointer into the `VectorIndex`, set once an embedding has been computed.
    pub embedding_ref: Option<Uuid>,
}

impl Fact {
    /// A fact is current iff it has not been superseded and has not expired.
    #[must_use]
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.superseded_at.is_none() && self.expires_at.map_or(true, |exp| exp > now)
    }

    /// Whether `as_of` falls within this fact's validity interval.
    #[must_use]
    pub fn valid_at(&self, as_of: DateTime<Utc>) -> bool {
        self.valid_from <= as_of && self.valid_to.map_or(true, |to| as_of <= to)
    }

    /// Append a reinforcement quote, truncating to the configured max length
    /// and keeping only the most recent `REINFORCEMENT_QUOTES_MAX_COUNT`.
    pub fn push_reinforcement_quote(&mut self, quote: &str) {
        let truncated: String = quote.chars().take(REINFORCEMENT_QUOTE_MAX_CHARS).collect();
        self.reinforced_quotes.push(truncated);
        if self.reinforced_quotes.len() > REINFORCEMENT_QUOTES_MAX_COUNT {
            let overflow = self.reinforced_quotes.len() - REINFORCEMENT_QUOTES_MAX_COUNT;
            self.reinforced_quotes.drain(0..overflow);
        }
    }

    /// The text used for display/injection: `summary` when present and
    /// shorter than `text`, else `text` itself.
    #[must_use]
    pub fn display_text(&self) -> &str {
        match &self.summary {
            Some(s) if s.len() < self.text.len() => s,
            _ => &self.text,
        }
    }
}

/// A partial update applied to a [`Fact`] via `KeyValueIndex::update`.
#[derive(Debug, Clone, Default)]
pub struct FactPatch {
    /// New tier, if changing.
    pub tier: Option<Tier>,
    /// New confidence, if changing.
    pub confidence: Option<f64>,
    /// New expiry, if changing. `Some(None)` clears it.
    pub expires_at: Option<Option<DateTime<Utc>>>,
    /// New recall count, if changing.
    pub recall_count: Option<u64>,
    /// New last-accessed timestamp, if changing.
    pub last_accessed_at: Option<DateTime<Utc>>,
    /// New reinforcement counter, if changing.
    pub reinforced_count: Option<u32>,
    /// New reinforcement quotes list, if changing.
    pub reinforced_quotes: Option<Vec<String>>,
    /// New last-reinforced timestamp, if changing.
    pub last_reinforced_at: Option<DateTime<Utc>>,
    /// New promoted-at timestamp, if changing.
    pub promoted_at: Option<Option<DateTime<Utc>>>,
    /// New supersedes-id, if changing.
    pub supersedes_id: Option<Option<Uuid>>,
    /// New superseded-by-id, if changing.
    pub superseded_by_id: Option<Option<Uuid>>,
    /// New superseded-at timestamp, if changing.
    pub superseded_at: Option<Option<DateTime<Utc>>>,
    /// New valid-to timestamp, if changing.
    pub valid_to: Option<Option<DateTime<Utc>>>,
    /// New scope, if changing (used by `promote_scope`).
    pub scope: Option<Scope>,
    /// New category, if changing (used by auto-classification).
    pub category: Option<Category>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fact() -> Fact {
        let now = Utc::now();
        Fact {
            id: Uuid::new_v4(),
            text: "User prefers dark mode".to_string(),
            summary: None,
            category: Category::Preference,
            entity: None,
            key: None,
            value: None,
            importance: 0.7,
            confidence: 0.9,
            decay_class: DecayClass::Stable,
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
            hash_normalized: "user prefers dark mode".to_string(),
            embedding_ref: None,
        }
    }

    #[test]
    fn current_fact_has_no_supersession_and_has_not_expired() {
        let mut f = sample_fact();
        assert!(f.is_current(Utc::now()));
        f.superseded_at = Some(Utc::now());
        assert!(!f.is_current(Utc::now()));
    }

    #[test]
    fn reinforcement_quotes_cap_at_ten_and_truncate_at_200_chars() {
        let mut f = sample_fact();
        for i in 0..15 {
            f.push_reinforcement_quote(&format!("quote number {i}"));
        }
        assert_eq!(f.reinforced_quotes.len(), 10);
        assert_eq!(f.reinforced_quotes.last().unwrap(), "quote number 14");

        let long_quote = "x".repeat(500);
        f.push_reinforcement_quote(&long_quote);
        assert_eq!(f.reinforced_quotes.last().unwrap().len(), 200);
    }

    #[test]
    fn category_roundtrips_through_label() {
        assert_eq!(Category::parse("preference").label(), "preference");
        let custom = Category::parse("mood");
        assert!(!custom.is_builtin());
        assert_eq!(custom.label(), "mood");
    }

    #[test]
    fn scope_visibility() {
        let user_scope = Scope::User {
            target: "alice".to_string(),
        };
        assert!(Scope::Global.visible_to(Some(&user_scope)));
        assert!(user_scope.visible_to(Some(&user_scope)));
        assert!(!user_scope.visible_to(Some(&Scope::User {
            target: "bob".to_string()
        })));
        assert!(!user_scope.visible_to(None));
    }
}
