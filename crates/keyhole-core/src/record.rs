use crate::shortcode::ShortCode;
use serde::{Deserialize, Serialize};

/// A stored URL record.
///
/// `deleted` is the only field that may change after creation; records are
/// never removed from storage, a deleted one stays resolvable for audit and
/// keeps reporting "gone" on lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The original URL that was shortened.
    pub original_url: String,
    /// Identity of the caller that created the record.
    pub owner_id: String,
    /// Soft-delete flag.
    pub deleted: bool,
}

/// A single soft-delete request queued for the deletion pipeline.
///
/// The stored record is only affected when its owner matches `owner_id`;
/// mismatches are skipped silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub code: ShortCode,
    pub owner_id: String,
}

/// Aggregate usage counters served on the trusted-subnet stats surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Number of live (not soft-deleted) shortened URLs.
    pub urls: u64,
    /// Number of distinct owners with at least one record.
    pub users: u64,
}
