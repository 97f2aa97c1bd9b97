//! Core data model: facts, links, procedures, checkpoints, credentials, and
//! the write-ahead log record shape that makes compound writes recoverable.

mod checkpoint;
mod config;
mod credential;
mod fact;
mod link;
mod procedure;
mod wal;

pub use checkpoint::Checkpoint;
pub use config::{
    AutoRecallConfig, CredentialsConfig, GraphConfig, InjectionFormat, MemoryConfig,
    ProceduresConfig, StoreConfig, TieringConfig, WalConfig,
};
pub use credential::{Credential, CredentialType};
pub use fact::{Category, DecayClass, Fact, FactPatch, Scope, Tier};
pub use link::{FactLink, LinkType};
pub use procedure::{Procedure, ProcedureStep, ProcedureType};
pub use wal::{WalOperation, WalPayload, WalRecord};
