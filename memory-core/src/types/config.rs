use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_HOT_MAX_FACTS, DEFAULT_HOT_MAX_TOKENS, DEFAULT_INACTIVE_PREFERENCE_DAYS,
    DEFAULT_PROMOTION_THRESHOLD, DEFAULT_TRAVERSAL_DEPTH, DEFAULT_WAL_MAX_AGE,
};

/// Output packing format for a recall's injected block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionFormat {
    /// `- [<backend>/<category>] <text>`.
    Full,
    /// `- <category>: <text>`.
    Short,
    /// `- <text>`.
    Minimal,
    /// A numbered index of candidates, resolved by position on a later call.
    Progressive,
    /// Pinned/long-lived facts rendered in full, the rest as a progressive index.
    ProgressiveHybrid,
}

/// Auto-recall tuning, mirrors spec §6's `auto_recall` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoRecallConfig {
    /// Whether recall runs automatically on `before_agent_start`.
    pub enabled: bool,
    /// Overall token budget for the injected block.
    pub max_tokens: usize,
    /// Per-fact character cap before truncation/summary kicks in.
    pub max_per_memory_chars: usize,
    /// Output packing format.
    pub injection_format: InjectionFormat,
    /// Maximum number of candidates considered before packing.
    pub limit: usize,
    /// Minimum vector-search cosine score to consider a candidate.
    pub min_score: f64,
    /// Multiply permanent/stable facts' score upward.
    pub prefer_long_term: bool,
    /// Apply the importance/recency multiplier during scoring.
    pub use_importance_recency: bool,
    /// Char length past which `summary` is preferred over `text`.
    pub summary_threshold: usize,
    /// Max chars for a generated summary.
    pub summary_max_chars: usize,
    /// Prefer `summary` over `text` in the injected block when present.
    pub use_summary_in_injection: bool,
    /// When packing must drop results, replace them with an LLM summary
    /// instead of silently truncating.
    pub summarize_when_over_budget: bool,
    /// Max candidates considered for the progressive index.
    pub progressive_max_candidates: usize,
    /// Token budget for the progressive index itself.
    pub progressive_index_max_tokens: usize,
    /// Group the progressive index by category.
    pub progressive_group_by_category: bool,
    /// Recall-count threshold above which a fact is pinned in `progressive_hybrid`.
    pub progressive_pinned_recall_count: u64,
    /// Behaviour on auth failure talking to external services.
    pub auth_failure: AuthFailureBehavior,
    /// Whether entity-lookup expansion runs during recall.
    pub entity_lookup: bool,
    /// Whether scope filtering is enforced during recall.
    pub scope_filter: bool,
}

impl Default for AutoRecallConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tokens: 1_500,
            max_per_memory_chars: 500,
            injection_format: InjectionFormat::Full,
            limit: 10,
            min_score: 0.3,
            prefer_long_term: true,
            use_importance_recency: true,
            summary_threshold: 300,
            summary_max_chars: 150,
            use_summary_in_injection: true,
            summarize_when_over_budget: false,
            progressive_max_candidates: 50,
            progressive_index_max_tokens: 500,
            progressive_group_by_category: true,
            progressive_pinned_recall_count: 5,
            auth_failure: AuthFailureBehavior::FallbackFtsOnly,
            entity_lookup: true,
            scope_filter: true,
        }
    }
}

/// What recall falls back to when an external service call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailureBehavior {
    /// Skip vector expansion and hypothetical-answer expansion, serve FTS only.
    FallbackFtsOnly,
    /// Return an empty recall block.
    ReturnEmpty,
}

/// Store-time behaviour: dedupe and classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Reject inserts whose `hash_normalized` matches a current fact.
    pub fuzzy_dedupe: bool,
    /// Ask the classifier which of ADD/UPDATE/DELETE/NOOP applies before writing.
    pub classify_before_write: bool,
    /// The classifier model identifier, passed through to the `Classifier` trait.
    pub classify_model: String,
    /// Reinforcement counter threshold for promotion to high confidence.
    pub promotion_threshold: u32,
    /// Whether credential-like payloads are detected and redirected to the vault.
    pub credential_detection: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            fuzzy_dedupe: true,
            classify_before_write: false,
            classify_model: "default".to_string(),
            promotion_threshold: DEFAULT_PROMOTION_THRESHOLD,
            credential_detection: true,
        }
    }
}

/// Write-ahead log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalConfig {
    /// Whether the WAL is active. Disabling it trades durability for throughput.
    pub enabled: bool,
    /// Override path for the WAL file; defaults to `<root>/memory.wal`.
    pub path: Option<String>,
    /// Records older than this are pruned without replay on recovery.
    pub max_age_ms: i64,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            max_age_ms: DEFAULT_WAL_MAX_AGE.as_millis() as i64,
        }
    }
}

/// Graph-layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Whether the graph layer is active at all.
    pub enabled: bool,
    /// Automatically create `RELATED_TO` edges between co-recalled facts.
    pub auto_link: bool,
    /// Minimum score a vector match needs to trigger auto-linking.
    pub auto_link_min_score: f64,
    /// Max auto-links created per recall call.
    pub auto_link_limit: usize,
    /// Max traversal depth used by recall's graph-expansion step.
    pub max_traversal_depth: u32,
    /// Whether graph expansion runs during recall at all.
    pub use_in_recall: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_link: true,
            auto_link_min_score: 0.6,
            auto_link_limit: 5,
            max_traversal_depth: DEFAULT_TRAVERSAL_DEPTH,
            use_in_recall: true,
        }
    }
}

/// Hot/warm/cold tiering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TieringConfig {
    /// Whether tiering/compaction runs at all.
    pub enabled: bool,
    /// Token budget for hot-tier injection.
    pub hot_max_tokens: usize,
    /// Fact-count cap for the hot tier.
    pub hot_max_facts: usize,
    /// Days of inactivity after which a preference demotes from hot/warm to warm.
    pub inactive_preference_days: i64,
    /// Run a compaction pass when a session ends, in addition to the scheduler.
    pub compaction_on_session_end: bool,
}

impl Default for TieringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hot_max_tokens: DEFAULT_HOT_MAX_TOKENS,
            hot_max_facts: DEFAULT_HOT_MAX_FACTS,
            inactive_preference_days: DEFAULT_INACTIVE_PREFERENCE_DAYS,
            compaction_on_session_end: true,
        }
    }
}

/// Procedure store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProceduresConfig {
    /// Whether the procedure store is active.
    pub enabled: bool,
    /// Max procedures returned by `search`.
    pub search_limit: usize,
    /// Score boost applied to a reinforced procedure.
    pub reinforce_boost: f64,
}

impl Default for ProceduresConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_limit: 5,
            reinforce_boost: 0.2,
        }
    }
}

/// Credential vault configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Whether the vault is active. When disabled, credential-like payloads
    /// are stored as plain facts with a warning, per the fallback policy.
    pub enabled: bool,
    /// Override path for the vault file; defaults to `<root>/credentials.db`.
    pub path: Option<String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Root directory for `facts.db`, `credentials.db`, `memory.wal`, and the
    /// category registry file.
    pub root: String,
    /// Whether `agent_end` auto-captures matching spans as facts.
    pub auto_capture: bool,
    /// Max chars captured per auto-captured fact.
    pub capture_max_chars: usize,
    /// Auto-recall tuning.
    pub auto_recall: AutoRecallConfig,
    /// Store-time behaviour.
    pub store: StoreConfig,
    /// Write-ahead log configuration.
    pub wal: WalConfig,
    /// Graph-layer configuration.
    pub graph: GraphConfig,
    /// Hot/warm/cold tiering configuration.
    pub memory_tiering: TieringConfig,
    /// Procedure store configuration.
    pub procedures: ProceduresConfig,
    /// Credential vault configuration.
    pub credentials: CredentialsConfig,
    /// Embedding vector dimension; must match the configured embedding model.
    pub embedding_dimension: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            root: "~/.openclaw/memory".to_string(),
            auto_capture: true,
            capture_max_chars: 5_000,
            auto_recall: AutoRecallConfig::default(),
            store: StoreConfig::default(),
            wal: WalConfig::default(),
            graph: GraphConfig::default(),
            memory_tiering: TieringConfig::default(),
            procedures: ProceduresConfig::default(),
            credentials: CredentialsConfig::default(),
            embedding_dimension: 1536,
        }
    }
}

impl MemoryConfig {
    /// Parse a `MemoryConfig` override from TOML text, falling back to
    /// defaults for any field left unset.
    pub fn from_toml(text: &str) -> crate::Result<Self> {
        toml::from_str(text).map_err(|e| crate::Error::Configuration(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let cfg = MemoryConfig::default();
        let text = toml::to_string(&cfg).expect("serialize");
        let parsed = MemoryConfig::from_toml(&text).expect("parse");
        assert_eq!(parsed.embedding_dimension, cfg.embedding_dimension);
        assert_eq!(parsed.auto_recall.limit, cfg.auto_recall.limit);
    }

    #[test]
    fn partial_toml_override_keeps_remaining_defaults() {
        let parsed = MemoryConfig::from_toml("auto_capture = false\n").expect("parse");
        assert!(!parsed.auto_capture);
        assert_eq!(parsed.auto_recall.limit, AutoRecallConfig::default().limit);
    }
}
