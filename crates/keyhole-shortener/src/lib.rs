//! Shortening service and deletion pipeline.
//!
//! This crate owns the only orchestration logic in the system: code
//! generation with collision retry, the one-URL-one-code invariants on top
//! of a repository, and the batched soft-delete pipeline.

pub mod pipeline;
pub mod service;

pub use pipeline::{DeletionPipeline, FLUSH_INTERVAL};
pub use service::{ShortenOutcome, ShortenerService, MAX_COLLISION_RETRIES};
