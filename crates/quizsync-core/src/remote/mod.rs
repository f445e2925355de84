//! Remote document stores
//!
//! The remote side is a collection of documents keyed by string identity.
//! [`RemoteStore`] is the seam the sync engine talks to:
//!
//! - [`MemoryRemote`] - in-process collections, for tests and offline use
//! - [`JsonFileRemote`] - a JSON file on disk
//! - [`HttpRemote`] - a REST document endpoint
//!
//! Every implementation guarantees that [`RemoteStore::commit`] applies a
//! batch all-or-nothing.

mod file;
mod http;
mod memory;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{Record, RemoteDocument};

pub use file::JsonFileRemote;
pub use http::HttpRemote;
pub use memory::MemoryRemote;

/// Errors talking to a remote store
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Connection, timeout or protocol failure
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Remote answered with a non-success status
    #[error("Remote returned {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// Remote file could not be read or written
    #[error("Remote file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Remote data was not in the expected shape
    #[error("Malformed remote data: {0}")]
    Decode(#[from] serde_json::Error),

    /// Remote URL could not be used as a base for endpoints
    #[error("Invalid remote URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Remote refused the operation
    #[error("Remote unavailable: {0}")]
    Unavailable(String),
}

impl RemoteError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RemoteError::Io {
            path: path.into(),
            source,
        }
    }
}

/// One keyed write inside a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetOp {
    pub id: String,
    pub fields: Record,
}

/// A set of writes committed atomically to one collection
#[derive(Debug, Clone, PartialEq)]
pub struct WriteBatch {
    collection: String,
    writes: Vec<SetOp>,
}

impl WriteBatch {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            writes: Vec::new(),
        }
    }

    /// Queue a full overwrite of the document keyed by `id`
    pub fn set(&mut self, id: impl Into<String>, fields: Record) {
        self.writes.push(SetOp {
            id: id.into(),
            fields,
        });
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn writes(&self) -> &[SetOp] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<SetOp> {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// A remote document collection store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch every document of a collection in one call
    async fn fetch_all(&self, collection: &str) -> Result<Vec<RemoteDocument>, RemoteError>;

    /// Overwrite a single document
    async fn set(&self, collection: &str, id: &str, fields: Record) -> Result<(), RemoteError>;

    /// Apply every write of the batch, or none of them
    async fn commit(&self, batch: WriteBatch) -> Result<(), RemoteError>;

    /// Short description for status output
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: RemoteStore + ?Sized> RemoteStore for Box<T> {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<RemoteDocument>, RemoteError> {
        (**self).fetch_all(collection).await
    }

    async fn set(&self, collection: &str, id: &str, fields: Record) -> Result<(), RemoteError> {
        (**self).set(collection, id, fields).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), RemoteError> {
        (**self).commit(batch).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[async_trait]
impl<T: RemoteStore + ?Sized> RemoteStore for Arc<T> {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<RemoteDocument>, RemoteError> {
        (**self).fetch_all(collection).await
    }

    async fn set(&self, collection: &str, id: &str, fields: Record) -> Result<(), RemoteError> {
        (**self).set(collection, id, fields).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), RemoteError> {
        (**self).commit(batch).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
