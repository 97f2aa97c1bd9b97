//! File-backed `WriteAheadLog`: a newline-delimited-JSON append log guarded
//! by an async mutex so concurrent compound writes serialize, with fsync
//! after every append and threshold-gated compaction.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use memory_core::constants::DEFAULT_WAL_COMPACT_THRESHOLD_BYTES;
use memory_core::storage::WriteAheadLog;
use memory_core::types::{WalLine, WalRecord, WalTombstone};
use memory_core::{Error, Result};
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::util::with_db_timeout;

/// NDJSON write-ahead log backed by a single file.
pub struct FileWriteAheadLog {
    path: PathBuf,
    guard: Mutex<()>,
    compact_threshold_bytes: u64,
}

impl FileWriteAheadLog {
    /// Open (creating if absent) the WAL file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub async fn open(path: &Path) -> Result<Self> {
        let path_buf = path.to_path_buf();
        let open_path = path_buf.clone();
        with_db_timeout(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&open_path)
                .map(|_| ())
                .map_err(Error::Io)
        })
        .await?;

        Ok(Self {
            path: path_buf,
            guard: Mutex::new(()),
            compact_threshold_bytes: DEFAULT_WAL_COMPACT_THRESHOLD_BYTES,
        })
    }

    /// Like [`Self::open`] but with an explicit compaction threshold, for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub async fn open_with_threshold(path: &Path, compact_threshold_bytes: u64) -> Result<Self> {
        let wal = Self::open(path).await?;
        Ok(Self {
            compact_threshold_bytes,
            ..wal
        })
    }

    fn read_lines(path: &Path) -> Result<Vec<WalLine>> {
        let contents = fs::read_to_string(path)?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .map_err(|e| Error::Serialization(format!("failed to parse WAL line: {e}")))
            })
            .collect()
    }

    async fn append_line(&self, line: WalLine) -> Result<()> {
        let _permit = self.guard.lock().await;
        let path = self.path.clone();
        let serialized = serde_json::to_string(&line)
            .map_err(|e| Error::Serialization(format!("failed to serialize WAL line: {e}")))?;

        with_db_timeout(move || {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(Error::Io)?;
            writeln!(file, "{serialized}").map_err(Error::Io)?;
            file.sync_data().map_err(Error::Io)?;
            Ok(())
        })
        .await
    }

    async fn maybe_compact(&self) -> Result<()> {
        if self.size_bytes().await? > self.compact_threshold_bytes {
            self.compact().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl WriteAheadLog for FileWriteAheadLog {
    #[instrument(skip(self, record), fields(record_id = %record.id))]
    async fn append(&self, record: &WalRecord) -> Result<()> {
        self.append_line(WalLine::Record(record.clone())).await
    }

    #[instrument(skip(self))]
    async fn clear(&self, id: Uuid) -> Result<()> {
        self.append_line(WalLine::Tombstone(WalTombstone { tombstone_id: id }))
            .await?;
        self.maybe_compact().await
    }

    async fn pending(&self) -> Result<Vec<WalRecord>> {
        let path = self.path.clone();
        with_db_timeout(move || {
            let lines = Self::read_lines(&path)?;
            let mut tombstoned = HashSet::new();
            let mut records = Vec::new();
            for line in lines {
                match line {
                    WalLine::Tombstone(t) => {
                        tombstoned.insert(t.tombstone_id);
                    }
                    WalLine::Record(r) => records.push(r),
                }
            }
            Ok(records
                .into_iter()
                .filter(|r| !tombstoned.contains(&r.id))
                .collect())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn compact(&self) -> Result<()> {
        let _permit = self.guard.lock().await;
        let path = self.path.clone();
        let tmp_path = path.with_extension("wal.compact.tmp");

        with_db_timeout(move || {
            let lines = Self::read_lines(&path)?;
            let tombstoned: HashSet<Uuid> = lines
                .iter()
                .filter_map(|l| match l {
                    WalLine::Tombstone(t) => Some(t.tombstone_id),
                    WalLine::Record(_) => None,
                })
                .collect();
            let kept: Vec<&WalRecord> = lines
                .iter()
                .filter_map(|l| match l {
                    WalLine::Record(r) if !tombstoned.contains(&r.id) => Some(r),
                    _ => None,
                })
                .collect();

            {
                let mut tmp = File::create(&tmp_path).map_err(Error::Io)?;
                for record in &kept {
                    let serialized = serde_json::to_string(&WalLine::Record((*record).clone()))
                        .map_err(|e| {
                            Error::Serialization(format!("failed to serialize WAL line: {e}"))
                        })?;
                    writeln!(tmp, "{serialized}").map_err(Error::Io)?;
                }
                tmp.sync_all().map_err(Error::Io)?;
            }
            fs::rename(&tmp_path, &path).map_err(Error::Io)?;
            debug!(kept = kept.len(), "WAL compacted");
            Ok(())
        })
        .await
    }

    async fn size_bytes(&self) -> Result<u64> {
        let path = self.path.clone();
        with_db_timeout(move || Ok(fs::metadata(&path).map_err(Error::Io)?.len())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use memory_core::types::{Scope, WalOperation, WalPayload};

    fn sample_record(id: Uuid) -> WalRecord {
        WalRecord {
            id,
            timestamp_ms: Utc::now().timestamp_millis(),
            operation: WalOperation::Store,
            data: WalPayload {
                text: "test fact".to_string(),
                category: "fact".to_string(),
                importance: 0.5,
                entity: None,
                key: None,
                value: None,
                source: "test".to_string(),
                decay_class: None,
                summary: None,
                tags: None,
                scope: Scope::Global,
                vector: None,
            },
        }
    }

    #[tokio::test]
    async fn append_then_pending_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let wal = FileWriteAheadLog::open(&dir.path().join("wal.ndjson"))
            .await
            .unwrap();
        let id = Uuid::new_v4();
        wal.append(&sample_record(id)).await.unwrap();

        let pending = wal.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
    }

    #[tokio::test]
    async fn clear_tombstones_a_record_out_of_pending() {
        let dir = tempfile::tempdir().unwrap();
        let wal = FileWriteAheadLog::open(&dir.path().join("wal.ndjson"))
            .await
            .unwrap();
        let id = Uuid::new_v4();
        wal.append(&sample_record(id)).await.unwrap();
        wal.clear(id).await.unwrap();

        assert!(wal.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn compact_drops_tombstoned_records_and_keeps_pending_ones() {
        let dir = tempfile::tempdir().unwrap();
        let wal = FileWriteAheadLog::open(&dir.path().join("wal.ndjson"))
            .await
            .unwrap();
        let cleared = Uuid::new_v4();
        let pending_id = Uuid::new_v4();
        wal.append(&sample_record(cleared)).await.unwrap();
        wal.append(&sample_record(pending_id)).await.unwrap();
        wal.clear(cleared).await.unwrap();
        wal.compact().await.unwrap();

        let pending = wal.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, pending_id);
    }
}
