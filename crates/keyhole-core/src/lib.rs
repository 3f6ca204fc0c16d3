//! Core types and contracts for the keyhole URL shortener.
//!
//! This crate defines the short-code value type, the record model, the
//! repository contract every storage backend implements, and the error
//! taxonomy shared by the service layer and the transport adapters.

pub mod error;
pub mod record;
pub mod repository;
pub mod shortcode;
pub mod subnet;

pub use error::{GeneratorError, ServiceError, StorageError, StorageResult};
pub use record::{DeleteRequest, UrlRecord, UsageStats};
pub use repository::{Repository, SAVE_BATCH_LIMIT};
pub use shortcode::{ShortCode, CODE_ALPHABET, CODE_LENGTH};
pub use subnet::TrustedSubnet;
