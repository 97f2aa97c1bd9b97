//! Typed directed edges between facts, Hebbian strengthening, and
//! bounded-depth traversal. Lives inside the `KeyValueIndex` but is exposed
//! as its own contract.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::constants::{
    HEBBIAN_INITIAL_STRENGTH, HEBBIAN_STRENGTHEN_STEP, MAX_TRAVERSAL_DEPTH,
};
use crate::storage::KeyValueIndex;
use crate::types::{FactLink, LinkType};
use crate::Result;

/// Typed edges and bounded traversal over the fact graph.
pub struct GraphStore {
    kv: Arc<dyn KeyValueIndex>,
}

impl GraphStore {
    /// Construct a `GraphStore` over the given `KeyValueIndex`.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueIndex>) -> Self {
        Self { kv }
    }

    /// Create a typed edge, idempotent on `(src, dst, type)`. On conflict the
    /// new strength replaces the old only if greater.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn create_link(
        &self,
        src: Uuid,
        dst: Uuid,
        link_type: LinkType,
        strength: f64,
    ) -> Result<()> {
        let existing = self.kv.get_link(src, dst, link_type).await?;
        let strength = match existing {
            Some(existing) if existing.strength >= strength => return Ok(()),
            _ => strength,
        };
        self.kv
            .upsert_link(FactLink::new(src, dst, link_type, strength))
            .await
    }

    /// Hebbian update: if a `RELATED_TO` edge exists between `a` and `b`,
    /// increase its strength by [`HEBBIAN_STRENGTHEN_STEP`] (clamped to
    /// `1.0`); otherwise create one at [`HEBBIAN_INITIAL_STRENGTH`]. Called
    /// when the retrieval pipeline includes both facts in a single result.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    #[instrument(skip(self))]
    pub async fn strengthen_related(&self, a: Uuid, b: Uuid) -> Result<()> {
        match self.kv.get_link(a, b, LinkType::RelatedTo).await? {
            Some(existing) => {
                let strength = (existing.strength + HEBBIAN_STRENGTHEN_STEP).min(1.0);
                self.kv
                    .upsert_link(FactLink::new(a, b, LinkType::RelatedTo, strength))
                    .await
            }
            None => {
                self.kv
                    .upsert_link(FactLink::new(a, b, LinkType::RelatedTo, HEBBIAN_INITIAL_STRENGTH))
                    .await
            }
        }
    }

    /// Breadth-first traversal from `ids` up to `max_depth` (hard-capped at
    /// [`MAX_TRAVERSAL_DEPTH`]), returning visited ids excluding the starting
    /// set. Link direction and weight are ignored for membership.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn connected(&self, ids: &[Uuid], max_depth: u32) -> Result<Vec<Uuid>> {
        let max_depth = max_depth.min(MAX_TRAVERSAL_DEPTH);
        let starts: HashSet<Uuid> = ids.iter().copied().collect();
        let mut visited: HashSet<Uuid> = starts.clone();
        let mut frontier: VecDeque<(Uuid, u32)> = ids.iter().map(|&id| (id, 0)).collect();
        let mut result = Vec::new();

        while let Some((id, depth)) = frontier.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let links = self.kv.links_for(id).await?;
            for link in links {
                let neighbour = if link.source_id == id {
                    link.target_id
                } else {
                    link.source_id
                };
                if visited.insert(neighbour) {
                    result.push(neighbour);
                    frontier.push_back((neighbour, depth + 1));
                }
            }
        }

        debug!(found = result.len(), max_depth, "graph traversal complete");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_depth_is_hard_capped() {
        assert_eq!(MAX_TRAVERSAL_DEPTH.min(10), MAX_TRAVERSAL_DEPTH);
        assert_eq!(5u32.min(MAX_TRAVERSAL_DEPTH), MAX_TRAVERSAL_DEPTH);
    }
}
