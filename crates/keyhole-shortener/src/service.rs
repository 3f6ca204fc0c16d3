use crate::pipeline::DeletionPipeline;
use keyhole_core::{
    DeleteRequest, Repository, ServiceError, ShortCode, StorageError, UsageStats,
};
use keyhole_generator::CodeGenerator;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Collision retries before a shorten call gives up. The code space holds
/// 62^8 values, so hitting this cap means the space is nearly exhausted or
/// the generator is broken; retrying forever would hang the call instead.
pub const MAX_COLLISION_RETRIES: u32 = 16;

/// Queued delete requests the intake channel holds before senders wait.
/// Overflow policy is backpressure: `request_deletion` awaits a free slot
/// rather than dropping or erroring.
pub const DELETE_QUEUE_CAPACITY: usize = 1024;

/// Outcome of a shorten call. Both cases carry the full short URL; the
/// distinction lets transports answer "created" vs "already exists"
/// without treating the duplicate as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortenOutcome {
    Created(String),
    Existing(String),
}

impl ShortenOutcome {
    pub fn short_url(&self) -> &str {
        match self {
            ShortenOutcome::Created(url) | ShortenOutcome::Existing(url) => url,
        }
    }

    pub fn already_existed(&self) -> bool {
        matches!(self, ShortenOutcome::Existing(_))
    }
}

/// Orchestrates code generation, uniqueness retry and lookups on top of a
/// [`Repository`].
///
/// Deletion requests never touch the repository on the request path; they
/// go through a bounded channel into the [`DeletionPipeline`], which
/// flushes them in batches.
pub struct ShortenerService<R> {
    repository: Arc<R>,
    generator: Arc<dyn CodeGenerator>,
    base_url: String,
    deletions: mpsc::Sender<DeleteRequest>,
}

impl<R> Clone for ShortenerService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            generator: Arc::clone(&self.generator),
            base_url: self.base_url.clone(),
            deletions: self.deletions.clone(),
        }
    }
}

impl<R: Repository> ShortenerService<R> {
    /// Builds the service together with its deletion pipeline. The caller
    /// spawns [`DeletionPipeline::run`] once at startup; the pipeline stops
    /// when the last clone of the service is dropped.
    pub fn new(
        repository: Arc<R>,
        generator: Arc<dyn CodeGenerator>,
        base_url: impl Into<String>,
    ) -> (Self, DeletionPipeline<R>) {
        let (deletions, intake) = mpsc::channel(DELETE_QUEUE_CAPACITY);
        let pipeline = DeletionPipeline::new(Arc::clone(&repository), intake);
        let service = Self {
            repository,
            generator: generator as Arc<dyn CodeGenerator>,
            base_url: base_url.into(),
            deletions,
        };
        (service, pipeline)
    }

    /// Shortens a URL, retrying on code collisions up to
    /// [`MAX_COLLISION_RETRIES`] times.
    ///
    /// A URL that was shortened before yields the existing mapping as
    /// [`ShortenOutcome::Existing`], never an error.
    pub async fn shorten(
        &self,
        original_url: &str,
        owner_id: &str,
    ) -> Result<ShortenOutcome, ServiceError> {
        for _ in 0..MAX_COLLISION_RETRIES {
            let code = self.generator.generate()?;
            match self
                .repository
                .save_one(&code, original_url, owner_id)
                .await
            {
                Ok(()) => return Ok(ShortenOutcome::Created(code.to_url(&self.base_url))),
                Err(StorageError::CodeCollision(_)) => continue,
                Err(StorageError::UrlAlreadyMapped(_)) => {
                    let existing = self
                        .repository
                        .find_by_original(original_url)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::Storage(
                                "mapping for an already-shortened url disappeared".to_owned(),
                            )
                        })?;
                    return Ok(ShortenOutcome::Existing(existing.to_url(&self.base_url)));
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ServiceError::CodeSpaceExhausted(MAX_COLLISION_RETRIES))
    }

    /// Shortens a batch keyed by caller-supplied correlation ids and
    /// returns the same keys mapped to short URLs.
    ///
    /// Codes are unique within the batch before the single `save_many`
    /// round trip; a failing batch surfaces one error and no partial
    /// result.
    pub async fn shorten_batch(
        &self,
        originals: &HashMap<String, String>,
        owner_id: &str,
    ) -> Result<HashMap<String, String>, ServiceError> {
        let mut short_urls = HashMap::with_capacity(originals.len());
        let mut entries: HashMap<ShortCode, String> = HashMap::with_capacity(originals.len());

        for (correlation_id, original_url) in originals {
            let code = self.fresh_batch_code(&entries)?;
            short_urls.insert(correlation_id.clone(), code.to_url(&self.base_url));
            entries.insert(code, original_url.clone());
        }

        self.repository.save_many(&entries, owner_id).await?;
        Ok(short_urls)
    }

    /// Generates a code not yet used in this batch. Collisions against the
    /// store itself still surface from `save_many`.
    fn fresh_batch_code(
        &self,
        entries: &HashMap<ShortCode, String>,
    ) -> Result<ShortCode, ServiceError> {
        for _ in 0..MAX_COLLISION_RETRIES {
            let code = self.generator.generate()?;
            if !entries.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(ServiceError::CodeSpaceExhausted(MAX_COLLISION_RETRIES))
    }

    /// Resolves a short code to its original URL.
    ///
    /// A soft-deleted record reports [`ServiceError::Gone`], distinct from
    /// [`ServiceError::NotFound`]; adapters map them to 410 vs 404.
    pub async fn resolve(&self, code: &str) -> Result<String, ServiceError> {
        // A malformed code cannot name any record.
        let code = ShortCode::parse(code).map_err(|_| ServiceError::NotFound)?;
        let record = self
            .repository
            .find_by_code(&code)
            .await?
            .ok_or(ServiceError::NotFound)?;
        if record.deleted {
            return Err(ServiceError::Gone);
        }
        Ok(record.original_url)
    }

    /// Lists the owner's records as short URL → original URL.
    pub async fn list_owned(&self, owner_id: &str) -> Result<HashMap<String, String>, ServiceError> {
        let owned = self.repository.list_by_owner(owner_id).await?;
        Ok(owned
            .into_iter()
            .map(|(code, original_url)| (code.to_url(&self.base_url), original_url))
            .collect())
    }

    /// Queues soft-delete requests for the pipeline and returns as soon as
    /// they are enqueued; transports answer "accepted", not "completed".
    /// Malformed codes are skipped, they cannot name a record.
    pub async fn request_deletion(&self, codes: &[String], owner_id: &str) {
        for raw in codes {
            let Ok(code) = ShortCode::parse(raw.as_str()) else {
                continue;
            };
            let request = DeleteRequest {
                code,
                owner_id: owner_id.to_owned(),
            };
            if self.deletions.send(request).await.is_err() {
                // Pipeline already stopped; shutdown drops buffered
                // deletions anyway.
                warn!("deletion pipeline is gone, dropping delete request");
                return;
            }
        }
    }

    pub async fn stats(&self) -> Result<UsageStats, ServiceError> {
        Ok(self.repository.stats().await?)
    }

    pub async fn ping(&self) -> Result<(), ServiceError> {
        Ok(self.repository.health_check().await?)
    }
}
