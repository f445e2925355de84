//! Local persistent storage
//!
//! SQLite-backed cache for question documents and the append-only
//! question log.

pub mod cache;
pub mod error;
pub mod schema;

pub use cache::{CacheStats, LocalCache, RecordKind};
pub use error::{StorageError, StorageResult};
pub use schema::SCHEMA_VERSION;
