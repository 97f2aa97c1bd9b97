use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of relationship a [`FactLink`] expresses between two facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// `source` replaces `target` in a supersession chain.
    Supersedes,
    /// `source` happened as a result of `target`.
    CausedBy,
    /// `source` is a constituent part of `target`.
    PartOf,
    /// Generic co-occurrence relation, subject to Hebbian strengthening.
    RelatedTo,
    /// `source` depends on `target` being true/valid.
    DependsOn,
}

/// A typed directed edge between two facts.
///
/// Unique on `(source_id, target_id, link_type)`: re-creating the same edge
/// does not duplicate the row, it only ever increases `strength`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactLink {
    /// The edge's origin fact.
    pub source_id: Uuid,
    /// The edge's destination fact.
    pub target_id: Uuid,
    /// The relationship type.
    pub link_type: LinkType,
    /// Edge weight in `[0, 1]`.
    pub strength: f64,
    /// When this edge was first created.
    pub created_at: DateTime<Utc>,
}

impl FactLink {
    /// Construct a new edge with the given strength, clamped to `[0, 1]`.
    #[must_use]
    pub fn new(source_id: Uuid, target_id: Uuid, link_type: LinkType, strength: f64) -> Self {
        Self {
            source_id,
            target_id,
            link_type,
            strength: strength.clamp(0.0, 1.0),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_is_clamped_on_construction() {
        let link = FactLink::new(Uuid::new_v4(), Uuid::new_v4(), LinkType::RelatedTo, 1.5);
        assert_eq!(link.strength, 1.0);
        let link = FactLink::new(Uuid::new_v4(), Uuid::new_v4(), LinkType::RelatedTo, -0.5);
        assert_eq!(link.strength, 0.0);
    }
}
