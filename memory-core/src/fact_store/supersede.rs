use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use crate::storage::GetOptions;
use crate::types::{FactLink, FactPatch, LinkType, Scope};
use crate::{Error, Result};

use super::FactStore;

impl FactStore {
    /// Supersede `old_id`: set `superseded_by_id`, `superseded_at = now`, and
    /// `valid_to = now` on it, and create a `SUPERSEDES` link when `new_id`
    /// is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `old_id` does not exist.
    #[instrument(skip(self))]
    pub async fn supersede(&self, old_id: Uuid, new_id: Option<Uuid>) -> Result<()> {
        let now = Utc::now();
        self.kv
            .get(old_id, GetOptions::default())
            .await?
            .ok_or(Error::NotFound(old_id))?;

        self.kv
            .update(
                old_id,
                FactPatch {
                    superseded_by_id: Some(new_id),
                    superseded_at: Some(Some(now)),
                    valid_to: Some(Some(now)),
                    ..Default::default()
                },
            )
            .await?;

        if let Some(new_id) = new_id {
            self.kv
                .upsert_link(FactLink::new(new_id, old_id, LinkType::Supersedes, 1.0))
                .await?;
        }

        Ok(())
    }

    /// Widen a session-scoped fact to a broader scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `id` does not exist, or
    /// [`Error::MissingScopeTarget`] if `scope` requires a non-empty target
    /// and none is given.
    pub async fn promote_scope(&self, id: Uuid, scope: Scope) -> Result<()> {
        if let Some(target) = scope.target() {
            if target.trim().is_empty() {
                return Err(Error::MissingScopeTarget {
                    scope: format!("{scope:?}"),
                });
            }
        }
        self.kv
            .get(id, GetOptions::default())
            .await?
            .ok_or(Error::NotFound(id))?;
        self.kv
            .update(
                id,
                FactPatch {
                    scope: Some(scope),
                    ..Default::default()
                },
            )
            .await
    }
}
