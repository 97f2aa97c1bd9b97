use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Category, DecayClass, Scope};

/// The two operations the write-ahead log is permitted to carry. Anything
/// else found in a recovered record is skipped and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalOperation {
    /// A new fact is being inserted.
    Store,
    /// An existing fact is being patched in place.
    Update,
}

/// Everything needed to idempotently replay a compound write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalPayload {
    /// The fact text.
    pub text: String,
    /// The fact category label.
    pub category: String,
    /// Importance in `[0, 1]`.
    pub importance: f64,
    /// Structured triple: entity.
    pub entity: Option<String>,
    /// Structured triple: key.
    pub key: Option<String>,
    /// Structured triple: value.
    pub value: Option<String>,
    /// Provenance string.
    pub source: String,
    /// Decay class, if already resolved at WAL-append time.
    pub decay_class: Option<DecayClass>,
    /// Optional short form.
    pub summary: Option<String>,
    /// Free-text tags.
    pub tags: Option<Vec<String>>,
    /// Visibility scope.
    pub scope: Scope,
    /// The precomputed embedding vector, so recovery never needs to call the
    /// embedder again.
    pub vector: Option<Vec<f32>>,
}

impl WalPayload {
    /// The category this payload resolves to, parsed from its label.
    #[must_use]
    pub fn category(&self) -> Category {
        Category::parse(&self.category)
    }
}

/// A pre-image of a compound write, sufficient to replay it after a crash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalRecord {
    /// The fact id this record concerns.
    pub id: Uuid,
    /// When this record was appended, in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// Which operation is being recorded.
    pub operation: WalOperation,
    /// The payload needed to replay the operation.
    pub data: WalPayload,
}

/// A WAL tombstone: marks `record_id` as durable and safe to drop on compaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalTombstone {
    /// The id of the record this tombstone retires.
    pub tombstone_id: Uuid,
}

/// A single line of the newline-delimited-JSON WAL file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WalLine {
    /// A pending compound write.
    Record(WalRecord),
    /// A marker retiring a previously-appended record.
    Tombstone(WalTombstone),
}
