use crate::error::StorageResult;
use crate::record::{DeleteRequest, UrlRecord, UsageStats};
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::collections::HashMap;

/// Largest number of rows a backend commits as one atomic unit in
/// [`Repository::save_many`]. Bigger batches are split into sequential
/// chunks of this size.
pub const SAVE_BATCH_LIMIT: usize = 1000;

/// Durable store for the short-code → original-URL mapping.
///
/// All three backends implement this contract with identical error
/// semantics; the service layer never reaches past it.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Inserts a single mapping.
    ///
    /// `CodeCollision` means the code is taken and the caller should
    /// regenerate and retry; `UrlAlreadyMapped` means a different record
    /// already owns this URL and retrying is pointless.
    async fn save_one(
        &self,
        code: &ShortCode,
        original_url: &str,
        owner_id: &str,
    ) -> StorageResult<()>;

    /// Inserts a batch of mappings with the same uniqueness semantics as
    /// [`Repository::save_one`].
    ///
    /// Batches above [`SAVE_BATCH_LIMIT`] are chunked into sequential
    /// atomic sub-batches; chunks committed before a failure stay
    /// committed.
    async fn save_many(
        &self,
        entries: &HashMap<ShortCode, String>,
        owner_id: &str,
    ) -> StorageResult<()>;

    /// Looks up the code a URL was previously shortened to.
    async fn find_by_original(&self, original_url: &str) -> StorageResult<Option<ShortCode>>;

    /// Looks up a record by code, soft-deleted ones included.
    async fn find_by_code(&self, code: &ShortCode) -> StorageResult<Option<UrlRecord>>;

    /// All records created by the owner, soft-deleted ones included. The
    /// contract stays uniform across backends; callers decide what to omit.
    async fn list_by_owner(&self, owner_id: &str) -> StorageResult<HashMap<ShortCode, String>>;

    /// Sets the deleted flag on every record whose stored owner matches the
    /// request. Ownership mismatches are skipped, not errors. Returns the
    /// number of rows affected.
    async fn mark_deleted(&self, requests: &[DeleteRequest]) -> StorageResult<u64>;

    /// Counts live URLs and distinct owners.
    async fn stats(&self) -> StorageResult<UsageStats>;

    /// Verifies the backend is reachable.
    async fn health_check(&self) -> StorageResult<()>;

    /// Releases backend resources. Callers must run this exactly once on
    /// every exit path.
    async fn shutdown(&self) -> StorageResult<()>;
}
