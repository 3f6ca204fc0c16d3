use crate::tables::Tables;
use async_trait::async_trait;
use keyhole_core::{
    DeleteRequest, Repository, ShortCode, StorageError, StorageResult, UrlRecord, UsageStats,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, RwLock};

/// One line of the append-only log.
#[derive(Debug, Serialize, Deserialize)]
struct LogEntry {
    sequence: u64,
    short_code: String,
    original_url: String,
    owner_id: String,
    deleted: bool,
}

#[derive(Debug)]
struct LogWriter {
    file: File,
    next_sequence: u64,
}

impl LogWriter {
    async fn append(&mut self, entry: &LogEntry) -> StorageResult<()> {
        let mut line = serde_json::to_vec(entry)
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        line.push(b'\n');
        self.file
            .write_all(&line)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        self.file
            .flush()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        self.next_sequence = entry.sequence + 1;
        Ok(())
    }
}

/// File-backed repository: the in-memory tables fronted by an append-only
/// JSON-lines log.
///
/// Every mutation is appended and flushed before the tables change, so a
/// crash never leaves the log behind the cache. Writers serialize on the
/// log mutex; readers only take the table lock and never wait on log I/O.
#[derive(Debug)]
pub struct FileRepository {
    tables: RwLock<Tables>,
    log: Mutex<LogWriter>,
}

impl FileRepository {
    /// Opens (or creates) the log at `path` and replays it sequentially to
    /// rebuild the tables. Replay applies each line's mutation in order:
    /// inserts overwrite (the last write for a sequence wins) and delete
    /// lines are idempotent.
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let mut tables = Tables::default();
        let mut next_sequence = 1;

        let replay = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .await
            .map_err(|e| StorageError::Unavailable(format!("open {}: {e}", path.display())))?;
        let mut lines = BufReader::new(replay).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?
        {
            if line.is_empty() {
                continue;
            }
            let entry: LogEntry = serde_json::from_str(&line)
                .map_err(|e| StorageError::InvalidData(format!("corrupt log line: {e}")))?;
            if entry.deleted {
                tables.mark_deleted_unchecked(&entry.short_code);
            } else {
                tables.insert(
                    &ShortCode::new_unchecked(entry.short_code),
                    &entry.original_url,
                    &entry.owner_id,
                );
            }
            next_sequence = next_sequence.max(entry.sequence + 1);
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await
            .map_err(|e| StorageError::Unavailable(format!("open {}: {e}", path.display())))?;

        tracing::info!(
            path = %path.display(),
            next_sequence,
            "replayed url log"
        );

        Ok(Self {
            tables: RwLock::new(tables),
            log: Mutex::new(LogWriter {
                file,
                next_sequence,
            }),
        })
    }

    /// Appends an insert line, then applies it to the tables. The caller
    /// must hold the log mutex so check-then-apply is race-free between
    /// writers.
    async fn log_insert(
        &self,
        log: &mut LogWriter,
        code: &ShortCode,
        original_url: &str,
        owner_id: &str,
    ) -> StorageResult<()> {
        let entry = LogEntry {
            sequence: log.next_sequence,
            short_code: code.as_str().to_owned(),
            original_url: original_url.to_owned(),
            owner_id: owner_id.to_owned(),
            deleted: false,
        };
        log.append(&entry).await?;
        self.tables.write().await.insert(code, original_url, owner_id);
        Ok(())
    }
}

#[async_trait]
impl Repository for FileRepository {
    async fn save_one(
        &self,
        code: &ShortCode,
        original_url: &str,
        owner_id: &str,
    ) -> StorageResult<()> {
        let mut log = self.log.lock().await;
        self.tables.read().await.check_unique(code, original_url)?;
        self.log_insert(&mut log, code, original_url, owner_id).await
    }

    async fn save_many(
        &self,
        entries: &HashMap<ShortCode, String>,
        owner_id: &str,
    ) -> StorageResult<()> {
        // Validate the whole batch before the first log line is written;
        // a conflicting entry must not leave partial inserts (or their
        // log lines) behind. The log mutex is held throughout, so no
        // writer can invalidate the check mid-batch.
        let mut log = self.log.lock().await;
        self.tables.read().await.check_unique_batch(entries)?;
        for (code, original_url) in entries {
            self.log_insert(&mut log, code, original_url, owner_id)
                .await?;
        }
        Ok(())
    }

    async fn find_by_original(&self, original_url: &str) -> StorageResult<Option<ShortCode>> {
        Ok(self.tables.read().await.code_for(original_url))
    }

    async fn find_by_code(&self, code: &ShortCode) -> StorageResult<Option<UrlRecord>> {
        Ok(self.tables.read().await.get(code))
    }

    async fn list_by_owner(&self, owner_id: &str) -> StorageResult<HashMap<ShortCode, String>> {
        Ok(self.tables.read().await.owned_by(owner_id))
    }

    async fn mark_deleted(&self, requests: &[DeleteRequest]) -> StorageResult<u64> {
        let mut log = self.log.lock().await;
        let mut affected = 0;
        for request in requests {
            // Ownership check happens before anything is written, so the
            // log never holds a delete line for a mismatched owner.
            let Some(record) = self.tables.read().await.get(&request.code) else {
                continue;
            };
            if record.owner_id != request.owner_id {
                continue;
            }
            let entry = LogEntry {
                sequence: log.next_sequence,
                short_code: request.code.as_str().to_owned(),
                original_url: record.original_url,
                owner_id: record.owner_id,
                deleted: true,
            };
            log.append(&entry).await?;
            self.tables.write().await.mark_deleted(request);
            affected += 1;
        }
        Ok(affected)
    }

    async fn stats(&self) -> StorageResult<UsageStats> {
        Ok(self.tables.read().await.usage())
    }

    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn shutdown(&self) -> StorageResult<()> {
        let log = self.log.lock().await;
        log.file
            .sync_all()
            .await
            .map_err(|e| StorageError::Operation(e.to_string()))
    }
}
