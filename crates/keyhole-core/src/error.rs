use thiserror::Error;

/// Result alias for repository operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors a storage backend may report.
///
/// The first two variants carry business meaning and every backend must
/// produce them under the same conditions; the rest describe infrastructure
/// failures and are propagated to the caller as-is.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The short code is already taken. Expected under concurrent writers;
    /// callers regenerate a code and retry.
    #[error("short code already taken: {0}")]
    CodeCollision(String),
    /// A different record already owns this original URL. Not retryable;
    /// callers look up the existing mapping instead.
    #[error("original url already mapped: {0}")]
    UrlAlreadyMapped(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

/// Failure of the short-code generator. The only cause is an unavailable
/// entropy source, which is fatal and never retried.
#[derive(Debug, Clone, Error)]
pub enum GeneratorError {
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),
}

/// Errors surfaced by the shortening service to transport adapters.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("short code not found")]
    NotFound,
    /// The record exists but was soft-deleted. Adapters map this to a
    /// different status than [`ServiceError::NotFound`] (410 vs 404).
    #[error("record was deleted")]
    Gone,
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    /// The collision retry cap was hit. Either the code space is close to
    /// exhausted or the generator is broken.
    #[error("could not find a free short code after {0} attempts")]
    CodeSpaceExhausted(u32),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for ServiceError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value.to_string())
    }
}
