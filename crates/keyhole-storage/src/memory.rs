use crate::tables::Tables;
use async_trait::async_trait;
use keyhole_core::{
    DeleteRequest, Repository, ShortCode, StorageResult, UrlRecord, UsageStats,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory implementation of the repository contract.
///
/// One lock guards the record table and its reverse index together, so
/// `save_one` can check both uniqueness invariants and insert inside a
/// single critical section. Reads share the lock; writes take it
/// exclusively.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn save_one(
        &self,
        code: &ShortCode,
        original_url: &str,
        owner_id: &str,
    ) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables.check_unique(code, original_url)?;
        tables.insert(code, original_url, owner_id);
        Ok(())
    }

    async fn save_many(
        &self,
        entries: &HashMap<ShortCode, String>,
        owner_id: &str,
    ) -> StorageResult<()> {
        // The whole batch is validated before anything mutates, so a
        // conflicting entry leaves no partial insert behind — the same
        // all-or-nothing outcome the SQL backend gets from its
        // per-chunk transaction.
        let mut tables = self.tables.write().await;
        tables.check_unique_batch(entries)?;
        for (code, original_url) in entries {
            tables.insert(code, original_url, owner_id);
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
        let mut tables = self.tables.write().await;
        let mut affected = 0;
        for request in requests {
            if tables.mark_deleted(request) {
                affected += 1;
            }
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
        Ok(())
    }
}
