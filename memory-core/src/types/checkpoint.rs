use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ephemeral in-progress-task marker, TTL 4 hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Globally unique identifier.
    pub id: Uuid,
    /// The intent or goal being worked toward.
    pub intent: String,
    /// Free-form description of current state.
    pub state: String,
    /// What success looks like, if known.
    pub expected_outcome: Option<String>,
    /// File paths touched while working toward this intent.
    pub working_files: Vec<String>,
    /// When this checkpoint was saved.
    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Whether this checkpoint has exceeded its 4-hour TTL.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.saved_at) > chrono::Duration::hours(4)
    }
}
