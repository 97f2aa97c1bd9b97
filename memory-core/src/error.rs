//! Error taxonomy for the memory engine.
//!
//! Every fallible operation in `memory-core` returns [`Result<T>`]. Variants map
//! directly onto the five error classes the engine distinguishes: validation
//! failures never have side effects, transient failures are retried by callers,
//! durability failures leave a WAL record behind for recovery, integrity
//! failures disable the affected subsystem, and security failures are refused
//! outright rather than silently dropped.

use uuid::Uuid;

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the hybrid memory store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad input or a caller-visible constraint violation. No side effects occurred.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A fuzzy-dedupe match against a current fact refused the insert.
    #[error("duplicate of existing fact {0}")]
    Duplicate(Uuid),

    /// The requested fact, link, procedure, or credential does not exist.
    #[error("not found: {0}")]
    NotFound(Uuid),

    /// A scope-scoped fact was missing its required `scope_target`.
    #[error("scope {scope} requires a scope_target")]
    MissingScopeTarget {
        /// The scope that required a target.
        scope: String,
    },

    /// Lock contention on the index exceeded the configured busy timeout.
    #[error("index busy: {0}")]
    Busy(String),

    /// An external service (embedder, chat, classifier) timed out or was unreachable.
    #[error("external service timeout: {0}")]
    Timeout(String),

    /// WAL append failed, or a compound write succeeded in one index but not the other.
    #[error("durability failure: {0}")]
    Durability(String),

    /// Permanent corruption, a dimension mismatch, or a schema too new to open.
    #[error("integrity failure: {0}")]
    Integrity(String),

    /// A credential-like payload was refused rather than stored unencrypted.
    #[error("security: {0}")]
    Security(String),

    /// The vault key could not decrypt an existing ciphertext.
    #[error("vault key rejected: {0}")]
    VaultKeyInvalid(String),

    /// Underlying storage engine error (redb, file system).
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error (postcard, serde_json).
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error reading or writing the WAL, category registry, or vault file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error: malformed TOML or an out-of-range field.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether a caller may retry this operation with bounded back-off.
    ///
    /// Used by the lifecycle scheduler and the boundary adapter to decide
    /// between an immediate retry, a conservative fallback, or surfacing the
    /// failure.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Busy(_) | Error::Timeout(_) | Error::Durability(_) | Error::Io(_)
        )
    }

    /// Whether the failure should disable the affected subsystem rather than
    /// simply be reported to the caller.
    #[must_use]
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Error::Integrity(_) | Error::VaultKeyInvalid(_))
    }

    /// Shorthand for constructing a [`Error::Validation`] from a displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_and_timeout_are_recoverable() {
        assert!(Error::Busy("lock".into()).is_recoverable());
        assert!(Error::Timeout("embedder".into()).is_recoverable());
        assert!(Error::Durability("wal append failed".into()).is_recoverable());
    }

    #[test]
    fn validation_and_security_are_not_recoverable() {
        assert!(!Error::Validation("bad input".into()).is_recoverable());
        assert!(!Error::Security("refused".into()).is_recoverable());
        assert!(!Error::Duplicate(Uuid::nil()).is_recoverable());
    }

    #[test]
    fn integrity_classification() {
        assert!(Error::Integrity("dimension mismatch".into()).is_integrity_failure());
        assert!(Error::VaultKeyInvalid("bad key".into()).is_integrity_failure());
        assert!(!Error::Busy("lock".into()).is_integrity_failure());
    }
}
