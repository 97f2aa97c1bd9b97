//! redb-backed storage for `memory-core`: one `Database` file for facts,
//! links, and procedures, a second for embedding vectors, a plain NDJSON
//! file for the write-ahead log, and a third `Database` file for the
//! encrypted credential vault.
//!
//! [`open_backends`] is the usual entry point — it resolves the four files
//! under a root directory the way [`MemoryConfig`] describes and returns
//! trait objects ready to hand to `memory_core::Engine::open`.

mod kv;
mod tables;
mod util;
mod vault;
mod vector;
mod wal;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use memory_core::storage::{CredentialVault, KeyValueIndex, VectorIndex, WriteAheadLog};
use memory_core::types::MemoryConfig;
use memory_core::Result;

pub use kv::RedbKeyValueIndex;
pub use vault::{RedbCredentialVault, VAULT_PASSPHRASE_ENV_VAR};
pub use vector::RedbVectorIndex;
pub use wal::FileWriteAheadLog;

/// The four storage handles an [`Engine`](memory_core::Engine) needs,
/// already opened and migrated.
pub struct RedbBackends {
    /// Fact, link, and procedure store.
    pub kv: Arc<dyn KeyValueIndex>,
    /// Embedding vector store.
    pub vectors: Arc<dyn VectorIndex>,
    /// Write-ahead log.
    pub wal: Arc<dyn WriteAheadLog>,
    /// Credential vault, `None` when `config.credentials.enabled` is false.
    pub vault: Option<Arc<dyn CredentialVault>>,
}

/// Open every backend named in `config` under `root`: `facts.db`,
/// `vectors.db`, `memory.wal` (or `config.wal.path`), and, when the vault is
/// enabled, `credentials.db` (or `config.credentials.path`).
///
/// # Errors
///
/// Returns an error if any backend fails to open, or if the vault is
/// enabled but [`VAULT_PASSPHRASE_ENV_VAR`] is unset.
pub async fn open_backends(root: &Path, config: &MemoryConfig) -> Result<RedbBackends> {
    let facts_path = root.join("facts.db");
    let vectors_path = root.join("vectors.db");
    let wal_path = config
        .wal
        .path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| root.join("memory.wal"));

    let kv: Arc<dyn KeyValueIndex> = Arc::new(RedbKeyValueIndex::open(&facts_path).await?);
    let vectors: Arc<dyn VectorIndex> =
        Arc::new(RedbVectorIndex::open(&vectors_path, config.embedding_dimension).await?);
    let wal: Arc<dyn WriteAheadLog> = Arc::new(FileWriteAheadLog::open(&wal_path).await?);

    let vault: Option<Arc<dyn CredentialVault>> = if config.credentials.enabled {
        let vault_path = config
            .credentials
            .path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| root.join("credentials.db"));
        Some(Arc::new(RedbCredentialVault::open(&vault_path).await?))
    } else {
        None
    };

    Ok(RedbBackends {
        kv,
        vectors,
        wal,
        vault,
    })
}
