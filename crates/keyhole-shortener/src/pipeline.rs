use keyhole_core::{DeleteRequest, Repository};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// How often buffered delete requests are flushed to the repository.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Background task that batches soft-delete requests.
///
/// Requests accumulate between ticks and are written with a single
/// `mark_deleted` call per flush, absorbing bursts of per-code deletes
/// into one repository round trip. A failed flush keeps the buffer and
/// tries again on the next tick, so a transient storage outage delays but
/// never drops a request while the process runs. The task stops only when
/// the intake channel closes at shutdown; whatever is still buffered at
/// that point is discarded.
pub struct DeletionPipeline<R> {
    repository: Arc<R>,
    intake: mpsc::Receiver<DeleteRequest>,
    interval: Duration,
}

impl<R: Repository> DeletionPipeline<R> {
    pub(crate) fn new(repository: Arc<R>, intake: mpsc::Receiver<DeleteRequest>) -> Self {
        Self {
            repository,
            intake,
            interval: FLUSH_INTERVAL,
        }
    }

    /// Overrides the flush interval; tests use a short one.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs until the intake channel closes. Spawn exactly once at process
    /// startup.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut buffer: Vec<DeleteRequest> = Vec::new();

        loop {
            tokio::select! {
                request = self.intake.recv() => match request {
                    Some(request) => buffer.push(request),
                    None => {
                        if !buffer.is_empty() {
                            info!(
                                dropped = buffer.len(),
                                "deletion pipeline stopping with unflushed requests"
                            );
                        }
                        return;
                    }
                },
                _ = ticker.tick() => {
                    if buffer.is_empty() {
                        continue;
                    }
                    match self.repository.mark_deleted(&buffer).await {
                        Ok(affected) => {
                            debug!(requested = buffer.len(), affected, "flushed delete batch");
                            buffer.clear();
                        }
                        Err(err) => {
                            // Keep the buffer; the next tick retries.
                            warn!(error = %err, pending = buffer.len(), "delete flush failed");
                        }
                    }
                }
            }
        }
    }
}
