//! Opaque external collaborators: the embedding provider, summarisation LLM,
//! and classification LLM. These are interfaces only; the engine never talks
//! to a concrete remote service directly. Failures fall back to conservative
//! behaviour per spec: classification failures default to `Add`, expansion
//! failures fall back to FTS-only recall.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

/// Computes a dense embedding vector for a piece of text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `text`, returning an L2-normalised vector of [`Embedder::dimension`] length.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Timeout`] on a provider timeout or unreachable
    /// service.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The fixed output dimension this embedder produces.
    fn dimension(&self) -> usize;
}

/// Calls a chat-completion model for summarisation and hypothetical-answer expansion.
#[async_trait]
pub trait Chat: Send + Sync {
    /// Complete `prompt` against `model` with the given sampling parameters.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Timeout`] on a provider timeout or unreachable
    /// service.
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<String>;
}

/// A candidate fact proposed for storage, as seen by the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierCandidate {
    /// The proposed fact text.
    pub text: String,
    /// The proposed category, if known.
    pub category: Option<String>,
}

/// A nearest-neighbour fact the classifier may compare the candidate against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierNeighbour {
    /// The neighbouring fact's id.
    pub id: Uuid,
    /// The neighbouring fact's text.
    pub text: String,
    /// Cosine similarity to the candidate.
    pub similarity: f32,
}

/// The action `FactStore::store` should take for a candidate fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionClass {
    /// Insert as a new fact.
    Add,
    /// Insert a new fact and supersede the target.
    Update,
    /// Supersede the target with a retraction (no new fact).
    Delete,
    /// Return the existing target unchanged.
    Noop,
}

/// The classifier's decision for a candidate fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierDecision {
    /// The chosen action.
    pub action: ActionClass,
    /// The neighbour this decision concerns, when the action is not `Add`.
    pub target_id: Option<Uuid>,
    /// A short human-readable justification, useful for logging.
    pub reason: String,
}

impl ClassifierDecision {
    /// The conservative fallback decision used when the classifier is
    /// unavailable or times out.
    #[must_use]
    pub fn fallback_add() -> Self {
        Self {
            action: ActionClass::Add,
            target_id: None,
            reason: "classifier unavailable, defaulting to add".to_string(),
        }
    }
}

/// Decides which of ADD/UPDATE/DELETE/NOOP applies to a candidate fact given
/// its nearest neighbours.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `candidate` against `neighbours`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Timeout`] on a provider timeout or unreachable
    /// service. Callers should fall back to [`ClassifierDecision::fallback_add`].
    async fn classify(
        &self,
        candidate: &ClassifierCandidate,
        neighbours: &[ClassifierNeighbour],
    ) -> Result<ClassifierDecision>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_decision_is_add_with_no_target() {
        let decision = ClassifierDecision::fallback_add();
        assert_eq!(decision.action, ActionClass::Add);
        assert!(decision.target_id.is_none());
    }
}
