use keyhole_core::{
    DeleteRequest, ShortCode, StorageError, StorageResult, UrlRecord, UsageStats,
};
use std::collections::{HashMap, HashSet};

/// Table state shared by the in-memory and file backends: the record table
/// keyed by code plus a reverse index for the URL-uniqueness invariant.
///
/// The reverse index keeps its entry when a record is soft-deleted, so a
/// deleted URL still cannot be mapped a second time and its code is never
/// reused.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    records: HashMap<String, UrlRecord>,
    by_original: HashMap<String, String>,
}

impl Tables {
    /// Checks both uniqueness invariants without mutating.
    pub(crate) fn check_unique(&self, code: &ShortCode, original_url: &str) -> StorageResult<()> {
        if self.records.contains_key(code.as_str()) {
            return Err(StorageError::CodeCollision(code.to_string()));
        }
        if self.by_original.contains_key(original_url) {
            return Err(StorageError::UrlAlreadyMapped(original_url.to_owned()));
        }
        Ok(())
    }

    /// Checks a whole batch against the tables and against itself, without
    /// mutating. Codes cannot repeat within a batch (they are map keys),
    /// but two entries may carry the same URL, which is just as much a
    /// uniqueness violation as a stored duplicate.
    pub(crate) fn check_unique_batch(
        &self,
        entries: &HashMap<ShortCode, String>,
    ) -> StorageResult<()> {
        let mut batch_urls = HashSet::with_capacity(entries.len());
        for (code, original_url) in entries {
            self.check_unique(code, original_url)?;
            if !batch_urls.insert(original_url.as_str()) {
                return Err(StorageError::UrlAlreadyMapped(original_url.clone()));
            }
        }
        Ok(())
    }

    pub(crate) fn insert(&mut self, code: &ShortCode, original_url: &str, owner_id: &str) {
        self.records.insert(
            code.as_str().to_owned(),
            UrlRecord {
                original_url: original_url.to_owned(),
                owner_id: owner_id.to_owned(),
                deleted: false,
            },
        );
        self.by_original
            .insert(original_url.to_owned(), code.as_str().to_owned());
    }

    /// Sets the deleted flag when the stored owner matches. Returns whether
    /// the record was affected; repeated deletes count again, mirroring the
    /// rows-affected semantics of the set-based SQL update.
    pub(crate) fn mark_deleted(&mut self, request: &DeleteRequest) -> bool {
        match self.records.get_mut(request.code.as_str()) {
            Some(record) if record.owner_id == request.owner_id => {
                record.deleted = true;
                true
            }
            _ => false,
        }
    }

    /// Marks a record deleted regardless of owner. Only used by log replay,
    /// where the ownership check already happened before the line was
    /// written.
    pub(crate) fn mark_deleted_unchecked(&mut self, code: &str) {
        if let Some(record) = self.records.get_mut(code) {
            record.deleted = true;
        }
    }

    pub(crate) fn get(&self, code: &ShortCode) -> Option<UrlRecord> {
        self.records.get(code.as_str()).cloned()
    }

    pub(crate) fn code_for(&self, original_url: &str) -> Option<ShortCode> {
        self.by_original
            .get(original_url)
            .map(ShortCode::new_unchecked)
    }

    pub(crate) fn owned_by(&self, owner_id: &str) -> HashMap<ShortCode, String> {
        self.records
            .iter()
            .filter(|(_, record)| record.owner_id == owner_id)
            .map(|(code, record)| {
                (
                    ShortCode::new_unchecked(code.clone()),
                    record.original_url.clone(),
                )
            })
            .collect()
    }

    pub(crate) fn usage(&self) -> UsageStats {
        let urls = self.records.values().filter(|r| !r.deleted).count() as u64;
        let users = self
            .records
            .values()
            .map(|r| r.owner_id.as_str())
            .collect::<HashSet<_>>()
            .len() as u64;
        UsageStats { urls, users }
    }
}
