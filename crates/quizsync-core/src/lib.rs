//! quizsync Core Library
//!
//! This crate provides the core functionality for quizsync, a local-first
//! cache and sync layer for a question bank held in a remote document
//! store.
//!
//! # Architecture
//!
//! - **Remote store**: source of truth, a collection of keyed documents
//! - **Local cache**: SQLite copy serving every local read and edit
//!
//! Pulls replace the cache with the remote collection; pushes write the
//! cache back in one atomic batch. Remote records are validated against
//! declarative contracts on the way in, and kept even when they fail.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let cache = Arc::new(LocalCache::open(&config)?);
//! let engine = SyncEngine::new(cache.clone(), MemoryRemote::new(), "questions");
//!
//! let pulled = engine.pull_questions().await?;
//! let report = engine.push_questions().await?;
//! ```
//!
//! # Modules
//!
//! - `sync`: Pull/push engine (main entry point)
//! - `storage`: SQLite cache with versioned schema
//! - `remote`: Remote store trait and its memory, file and HTTP backends
//! - `schema`: Record contracts and validation
//! - `document`: Record/remote-document conversion
//! - `models`: Typed records
//! - `config`: Application configuration

pub mod config;
pub mod document;
pub mod models;
pub mod remote;
pub mod schema;
pub mod storage;
pub mod sync;

pub use config::{Config, RemoteLocation};
pub use document::{DocumentConverter, Record, RemoteDocument};
pub use models::{CachedQuestion, Difficulty, LogEntry, NewLogEntry, Question};
pub use remote::{HttpRemote, JsonFileRemote, MemoryRemote, RemoteError, RemoteStore, WriteBatch};
pub use schema::{SchemaRegistry, ValidationError};
pub use storage::{CacheStats, LocalCache, RecordKind, StorageError};
pub use sync::{Direction, PullReport, PushReport, SyncEngine, SyncError, SyncEvent};
