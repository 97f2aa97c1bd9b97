use async_trait::async_trait;
use uuid::Uuid;

use crate::types::WalRecord;
use crate::Result;

/// Append-only log of intended compound operations, recovered on startup.
///
/// Protocol for a compound write: append the record and fsync, apply to the
/// `KeyValueIndex`, apply to the `VectorIndex`, then clear the record. After
/// recovery, either both indexes contain the write or neither does, for any
/// record whose age was within `max_age` at the moment of the crash.
#[async_trait]
pub trait WriteAheadLog: Send + Sync {
    /// Append a record and fsync before returning.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Durability`] if the append or fsync fails.
    async fn append(&self, record: &WalRecord) -> Result<()>;

    /// Mark `id` durable in both indexes; implementations may append a
    /// tombstone or remove the record outright.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Durability`] on a write failure.
    async fn clear(&self, id: Uuid) -> Result<()>;

    /// Read back every still-pending record, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error on read failure.
    async fn pending(&self) -> Result<Vec<WalRecord>>;

    /// Rewrite the log keeping only still-pending records, when its size
    /// exceeds the configured compaction threshold.
    ///
    /// # Errors
    ///
    /// Returns an error on read/write failure.
    async fn compact(&self) -> Result<()>;

    /// Current on-disk size of the log, in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be stat'd.
    async fn size_bytes(&self) -> Result<u64>;
}
