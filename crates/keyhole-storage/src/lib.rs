//! Storage backends for the keyhole URL shortener.
//!
//! Three implementations of the [`keyhole_core::Repository`] contract with
//! identical error semantics: an in-memory table, a file-backed variant
//! that fronts the same tables with an append-only log, and Postgres.

pub mod file;
pub mod memory;
pub mod postgres;

mod tables;

pub use file::FileRepository;
pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;
