use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::constants::CLASSIFICATION_NEIGHBOUR_COUNT;
use crate::extraction::{detect_credential, extract_tags, extract_triple, hash_normalized};
use crate::providers::{ActionClass, ClassifierCandidate, ClassifierDecision, ClassifierNeighbour};
use crate::storage::VectorRow;
use crate::types::{Category, Credential, DecayClass, Fact, Scope, Tier};
use crate::types::{WalOperation, WalPayload, WalRecord};
use crate::{Error, Result};

use super::FactStore;

/// Input to [`FactStore::store`].
#[derive(Debug, Clone)]
pub struct StoreArgs {
    /// The candidate fact text, truncated to `capture_max_chars` on store.
    pub text: String,
    /// The candidate category, if the caller already knows it.
    pub category: Option<Category>,
    /// Caller-declared importance, in `[0, 1]`. Defaults to `0.5`.
    pub importance: Option<f64>,
    /// Caller-declared decay class. Defaults to `DecayClass::Active`.
    pub decay_class: Option<DecayClass>,
    /// Visibility scope. Defaults to `Scope::Global`.
    pub scope: Scope,
    /// Free-text provenance.
    pub source: String,
    /// Free-text tags supplied by the caller, merged with extracted tags.
    pub tags: Vec<String>,
    /// Whether to run the candidate through the classifier on a dedupe miss.
    pub classify: bool,
}

impl StoreArgs {
    /// Construct the minimal required arguments, using all other defaults.
    #[must_use]
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: None,
            importance: None,
            decay_class: None,
            scope: Scope::Global,
            source: source.into(),
            tags: Vec::new(),
            classify: false,
        }
    }
}

/// The result of a `store` call: either a new fact, or the unchanged existing
/// fact for a NOOP classification outcome.
#[derive(Debug, Clone)]
pub enum StoreOutcome {
    /// A new fact was inserted.
    Inserted(Fact),
    /// The classifier determined the candidate duplicates an existing fact.
    Noop(Fact),
    /// The classifier determined the candidate retracts an existing fact;
    /// no new fact was created.
    Deleted {
        /// The fact that was retracted.
        retracted: Fact,
    },
}

impl StoreOutcome {
    /// The resulting fact, if any was inserted or matched.
    #[must_use]
    pub fn fact(&self) -> Option<&Fact> {
        match self {
            StoreOutcome::Inserted(f) | StoreOutcome::Noop(f) => Some(f),
            StoreOutcome::Deleted { .. } => None,
        }
    }
}

impl FactStore {
    /// Store a candidate fact: extract structured fields, check fuzzy dedupe,
    /// optionally classify against nearest neighbours, redirect
    /// credential-like payloads to the vault, then persist via the WAL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Duplicate`] on a fuzzy-dedupe hit with classification
    /// disabled, [`Error::Security`] if a credential-like payload cannot be
    /// parsed while the vault is enabled, and [`Error::Durability`] if the
    /// WAL append fails.
    #[instrument(skip(self, args), fields(source = %args.source))]
    pub async fn store(&self, args: StoreArgs) -> Result<StoreOutcome> {
        let text = truncate_chars(&args.text, self.config.capture_max_chars);
        let hash = hash_normalized(&text);

        // Classification only runs on a dedupe miss; a hash match is always refused.
        if self.config.store.fuzzy_dedupe {
            if let Some(existing_id) = self.kv.find_by_hash(&hash).await? {
                return Err(Error::Duplicate(existing_id));
            }
        }

        let (value, credential_pointer, redacted_text) = self.resolve_credential(&text).await?;
        let text = redacted_text.unwrap_or(text);

        let (entity, key, extracted_value) = extract_triple(&text);
        let value = value.or(extracted_value);
        let mut tags = extract_tags(&text);
        tags.extend(args.tags.clone());
        tags.sort();
        tags.dedup();

        let category = args.category.unwrap_or(Category::Other("other".to_string()));
        if !category.is_builtin() {
            self.categories.register(category.label())?;
        }

        let vector = match &self.embedder {
            Some(embedder) => match embedder.embed(&text).await {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(error = %e, "embedder call failed, storing without a vector");
                    None
                }
            },
            None => None,
        };

        let decision = if (args.classify || self.config.store.classify_before_write)
            && self.classifier.is_some()
        {
            self.classify_candidate(&text, category.label(), vector.as_deref())
                .await
        } else {
            ClassifierDecision {
                action: ActionClass::Add,
                target_id: None,
                reason: "classification disabled".to_string(),
            }
        };

        match decision.action {
            ActionClass::Noop => {
                let target_id = decision.target_id.ok_or_else(|| {
                    Error::Integrity("NOOP classification without a target id".to_string())
                })?;
                let existing = self
                    .kv
                    .get(target_id, crate::storage::GetOptions::default())
                    .await?
                    .ok_or(Error::NotFound(target_id))?;
                return Ok(StoreOutcome::Noop(existing));
            }
            ActionClass::Delete => {
                let target_id = decision.target_id.ok_or_else(|| {
                    Error::Integrity("DELETE classification without a target id".to_string())
                })?;
                self.supersede(target_id, None).await?;
                let retracted = self
                    .kv
                    .get(target_id, crate::storage::GetOptions::default())
                    .await?
                    .ok_or(Error::NotFound(target_id))?;
                return Ok(StoreOutcome::Deleted { retracted });
            }
            ActionClass::Add | ActionClass::Update => {}
        }

        let now = Utc::now();
        let decay_class = args.decay_class.unwrap_or(DecayClass::Active);
        let id = Uuid::new_v4();
        let fact = Fact {
            id,
            text: text.clone(),
            summary: None,
            category: category.clone(),
            entity,
            key,
            value: credential_pointer.or(value),
            importance: args.importance.unwrap_or(0.5).clamp(0.0, 1.0),
            confidence: 0.9,
            decay_class,
            tier: Tier::Warm,
            scope: args.scope.clone(),
            source: args.source.clone(),
            source_date: None,
            created_at: now,
            last_confirmed_at: now,
            last_accessed_at: now,
            expires_at: FactStore::compute_expiry(decay_class, now),
            tags,
            recall_count: 0,
            reinforced_count: 0,
            reinforced_quotes: Vec::new(),
            last_reinforced_at: None,
            promoted_at: None,
            supersedes_id: None,
            superseded_by_id: None,
            superseded_at: None,
            valid_from: now,
            valid_to: None,
            hash_normalized: hash.clone(),
            embedding_ref: vector.as_ref().map(|_| id),
        };

        validate_scope(&fact.scope)?;

        self.persist_compound_write(&fact, vector.clone()).await?;

        if decision.action == ActionClass::Update {
            if let Some(target_id) = decision.target_id {
                self.supersede(target_id, Some(id)).await?;
            }
        }

        debug!(fact_id = %id, "fact stored");
        Ok(StoreOutcome::Inserted(fact))
    }

    /// Execute the WAL → KV → vector → WAL-clear protocol for a new fact.
    async fn persist_compound_write(&self, fact: &Fact, vector: Option<Vec<f32>>) -> Result<()> {
        if self.config.wal.enabled {
            let record = WalRecord {
                id: fact.id,
                timestamp_ms: fact.created_at.timestamp_millis(),
                operation: WalOperation::Store,
                data: WalPayload {
                    text: fact.text.clone(),
                    category: fact.category.label().to_string(),
                    importance: fact.importance,
                    entity: fact.entity.clone(),
                    key: fact.key.clone(),
                    value: fact.value.clone(),
                    source: fact.source.clone(),
                    decay_class: Some(fact.decay_class),
                    summary: fact.summary.clone(),
                    tags: Some(fact.tags.clone()),
                    scope: fact.scope.clone(),
                    vector: vector.clone(),
                },
            };
            self.wal.append(&record).await?;
        }

        self.kv.insert(fact.clone()).await?;

        if let Some(vector) = vector {
            self.vectors
                .upsert(VectorRow {
                    id: fact.id,
                    vector,
                    category: fact.category.label().to_string(),
                    importance: fact.importance,
                })
                .await?;
        }

        if self.config.wal.enabled {
            self.wal.clear(fact.id).await?;
        }

        Ok(())
    }

    async fn classify_candidate(
        &self,
        text: &str,
        category: &str,
        vector: Option<&[f32]>,
    ) -> ClassifierDecision {
        let Some(classifier) = &self.classifier else {
            return ClassifierDecision::fallback_add();
        };

        let neighbours = match vector {
            Some(v) => match self
                .vectors
                .search(v, CLASSIFICATION_NEIGHBOUR_COUNT, 0.0)
                .await
            {
                Ok(hits) => {
                    let mut neighbours = Vec::with_capacity(hits.len());
                    for hit in hits {
                        if let Ok(Some(neighbour_fact)) = self
                            .kv
                            .get(hit.id, crate::storage::GetOptions::default())
                            .await
                        {
                            neighbours.push(ClassifierNeighbour {
                                id: hit.id,
                                text: neighbour_fact.text,
                                similarity: hit.cosine,
                            });
                        }
                    }
                    neighbours
                }
                Err(_) => Vec::new(),
            },
            None => Vec::new(),
        };

        let candidate = ClassifierCandidate {
            text: text.to_string(),
            category: Some(category.to_string()),
        };

        match classifier.classify(&candidate, &neighbours).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, "classifier call failed, defaulting to ADD");
                ClassifierDecision::fallback_add()
            }
        }
    }

    /// Detect a credential-like payload and redirect it to the vault,
    /// returning the pointer text to store in place of the raw secret and
    /// the candidate text with the secret span scrubbed out. The raw secret
    /// must never reach `facts.db`, only the `vault:<service>` pointer.
    async fn resolve_credential(
        &self,
        text: &str,
    ) -> Result<(Option<String>, Option<String>, Option<String>)> {
        if !self.config.store.credential_detection {
            return Ok((None, None, None));
        }
        let Some(detected) = detect_credential(text) else {
            return Ok((None, None, None));
        };

        let Some(vault) = &self.vault else {
            warn!("credential-like payload detected but vault is disabled; storing verbatim");
            return Ok((None, None, None));
        };

        vault
            .store(
                &detected.service,
                detected.credential_type,
                &detected.secret,
                None,
                None,
            )
            .await?;

        let pointer = Credential::pointer(&detected.service);
        let redacted_text = detected.redact(text, &pointer);

        info!(service = %detected.service, "credential redirected to vault");
        Ok((Some(pointer.clone()), Some(pointer), Some(redacted_text)))
    }
}

fn validate_scope(scope: &Scope) -> Result<()> {
    match scope {
        Scope::Global => Ok(()),
        Scope::User { target } | Scope::Agent { target } | Scope::Session { target } => {
            if target.trim().is_empty() {
                Err(Error::MissingScopeTarget {
                    scope: format!("{scope:?}"),
                })
            } else {
                Ok(())
            }
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
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
    fn scope_validation_rejects_empty_target() {
        let err = validate_scope(&Scope::User {
            target: String::new(),
        })
        .unwrap_err();
        assert!(matches!(err, Error::MissingScopeTarget { .. }));
    }

    #[test]
    fn scope_validation_accepts_global_and_populated_scopes() {
        assert!(validate_scope(&Scope::Global).is_ok());
        assert!(validate_scope(&Scope::User {
            target: "alice".to_string()
        })
        .is_ok());
    }

    #[test]
    fn truncate_chars_respects_character_boundaries() {
        let text = "héllo wörld";
        let truncated = truncate_chars(text, 5);
        assert_eq!(truncated.chars().count(), 5);
    }
}
