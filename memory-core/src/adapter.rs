//! Translates host lifecycle events and tool invocations to core operations,
//! and emits the formatted recall block. The adapter owns no long-lived
//! database state of its own beyond the per-session progressive-index cache.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::fact_store::{FactStore, StoreArgs};
use crate::procedure_store::ProcedureStore;
use crate::retrieval::{pack_hot, ProgressiveIndexCache, RecallRequest, RetrievalPipeline};
use crate::types::{Scope, TieringConfig};
use crate::Result;

/// A single user/assistant message observed during a session, as seen by
/// `agent_end`'s auto-capture pass.
#[derive(Debug, Clone)]
pub struct SessionMessage {
    /// `"user"` or `"assistant"`.
    pub role: String,
    /// The message text.
    pub text: String,
}

/// Keywords that mark a message span as worth auto-capturing. Matching is
/// case-insensitive substring search, intentionally language-agnostic rather
/// than a fixed English word list.
const CAPTURE_TRIGGERS: &[&str] = &[
    "remember",
    "prefer",
    "always",
    "never",
    "from now on",
    "going forward",
];

/// Translates host events to core operations and formats the recall block
/// the host prepends to the agent's context.
pub struct BoundaryAdapter {
    facts: Arc<FactStore>,
    pipeline: Arc<RetrievalPipeline>,
    procedures: Arc<ProcedureStore>,
    progressive_cache: ProgressiveIndexCache,
    auto_capture: bool,
    capture_max_chars: usize,
    tiering: TieringConfig,
    procedures_enabled: bool,
    procedures_search_limit: usize,
    procedures_reinforce_boost: f64,
}

impl BoundaryAdapter {
    /// Construct a `BoundaryAdapter` over the given fact store, pipeline, and
    /// procedure store.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        facts: Arc<FactStore>,
        pipeline: Arc<RetrievalPipeline>,
        procedures: Arc<ProcedureStore>,
        auto_capture: bool,
        capture_max_chars: usize,
        tiering: TieringConfig,
        procedures_config: crate::types::ProceduresConfig,
    ) -> Self {
        Self {
            facts,
            pipeline,
            procedures,
            progressive_cache: ProgressiveIndexCache::new(),
            auto_capture,
            capture_max_chars,
            tiering,
            procedures_enabled: procedures_config.enabled,
            procedures_search_limit: procedures_config.search_limit,
            procedures_reinforce_boost: procedures_config.reinforce_boost,
        }
    }

    /// `before_agent_start(prompt)`: run recall, cache the progressive-index
    /// position map, and return the formatted block to prepend to context.
    ///
    /// Assembles up to three sections in a fixed order — `<hot-memories>`,
    /// `<relevant-procedures>`, `<relevant-memories>` — omitting any section
    /// that has nothing to show rather than emitting it empty.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    #[instrument(skip(self, prompt))]
    pub async fn build_recall_block(&self, prompt: &str, request: RecallRequest) -> Result<String> {
        let mut request = request;
        if request.query.is_empty() {
            request.query = prompt.to_string();
        }

        let mut sections = Vec::new();

        if let Some(hot) = self.render_hot_section().await? {
            sections.push(hot);
        }

        if let Some(procedures) = self.render_procedures_section(&request.query).await? {
            sections.push(procedures);
        }

        let result = self.pipeline.recall(&request).await?;
        self.progressive_cache.replace(result.block.positions.clone());

        if !result.block.text.is_empty() {
            sections.push(format!(
                "<relevant-memories>\n{}\n</relevant-memories>",
                result.block.text
            ));
        }

        if sections.is_empty() {
            debug!("recall produced no candidates, returning empty block");
        }

        Ok(sections.join("\n"))
    }

    async fn render_hot_section(&self) -> Result<Option<String>> {
        let hot_facts = self.facts.list_hot().await?;
        if hot_facts.is_empty() {
            return Ok(None);
        }
        let block = pack_hot(&hot_facts, self.tiering.hot_max_tokens, self.tiering.hot_max_facts);
        if block.text.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!(
            "<hot-memories>\n{}\n</hot-memories>",
            block.text
        )))
    }

    async fn render_procedures_section(&self, query: &str) -> Result<Option<String>> {
        if !self.procedures_enabled || query.is_empty() {
            return Ok(None);
        }
        let matches = self
            .procedures
            .search(query, self.procedures_search_limit, self.procedures_reinforce_boost)
            .await?;
        if matches.is_empty() {
            return Ok(None);
        }
        let lines: Vec<String> = matches
            .iter()
            .map(|p| format!("- {} (confidence {:.2})", p.task_pattern, p.confidence))
            .collect();
        Ok(Some(format!(
            "<relevant-procedures>\n{}\n</relevant-procedures>",
            lines.join("\n")
        )))
    }

    /// Resolve a progressive-index position from the last `build_recall_block`
    /// call to its fact id.
    #[must_use]
    pub fn resolve_progressive_position(&self, position: u32) -> Option<uuid::Uuid> {
        self.progressive_cache.resolve(position)
    }

    /// `agent_end(success, messages)`: if auto-capture is enabled and the
    /// session succeeded, store up to three matching, non-sensitive spans.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure. Individual capture failures are
    /// logged and skipped rather than aborting the whole pass.
    #[instrument(skip(self, messages))]
    pub async fn observe_session_end(&self, success: bool, messages: &[SessionMessage]) -> Result<()> {
        if !self.auto_capture || !success {
            return Ok(());
        }

        let mut captured = 0;
        for message in messages {
            if captured >= 3 {
                break;
            }
            if !matches_capture_trigger(&message.text) {
                continue;
            }
            if crate::extraction::detect_credential(&message.text).is_some() {
                continue;
            }

            let args = StoreArgs {
                text: truncate(&message.text, self.capture_max_chars),
                category: None,
                importance: Some(0.5),
                decay_class: None,
                scope: Scope::Global,
                source: format!("session-capture:{}", message.role),
                tags: vec![],
                classify: false,
            };

            match self.facts.store(args).await {
                Ok(_) => captured += 1,
                Err(e) => warn!(error = %e, "auto-capture store failed, skipping span"),
            }
        }

        debug!(captured, "agent_end auto-capture complete");
        Ok(())
    }
}

fn matches_capture_trigger(text: &str) -> bool {
    let lower = text.to_lowercase();
    CAPTURE_TRIGGERS.iter().any(|t| lower.contains(t))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_trigger_matching_is_case_insensitive() {
        assert!(matches_capture_trigger("Please REMEMBER that I prefer tabs"));
        assert!(!matches_capture_trigger("what's the weather today"));
    }
}
