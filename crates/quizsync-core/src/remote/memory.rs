//! In-process remote store
//!
//! Clones share the same collections, so a test can keep a handle while
//! the engine owns another.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use super::{RemoteError, RemoteStore, WriteBatch};
use crate::document::{Record, RemoteDocument};

#[derive(Default)]
struct State {
    collections: HashMap<String, BTreeMap<String, Record>>,
    fail_fetch: Option<String>,
    fail_commit: Option<String>,
    commits: usize,
}

/// Remote store held in memory
#[derive(Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<State>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document under a fresh store-assigned id
    pub fn insert(&self, collection: &str, fields: Record) -> Result<String, RemoteError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.insert_with_id(collection, &id, fields)?;
        Ok(id)
    }

    pub fn insert_with_id(
        &self,
        collection: &str,
        id: &str,
        fields: Record,
    ) -> Result<(), RemoteError> {
        self.lock()?
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    /// Current body of one document
    pub fn get(&self, collection: &str, id: &str) -> Option<Record> {
        let state = self.lock().ok()?;
        state.collections.get(collection)?.get(id).cloned()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.lock()
            .map(|state| state.collections.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    /// Number of batches committed successfully
    pub fn commit_count(&self) -> usize {
        self.lock().map(|state| state.commits).unwrap_or(0)
    }

    /// Make the next `fetch_all` fail
    pub fn fail_next_fetch(&self, reason: impl Into<String>) {
        if let Ok(mut state) = self.lock() {
            state.fail_fetch = Some(reason.into());
        }
    }

    /// Make the next `commit` fail without applying anything
    pub fn fail_next_commit(&self, reason: impl Into<String>) {
        if let Ok(mut state) = self.lock() {
            state.fail_commit = Some(reason.into());
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, RemoteError> {
        self.state
            .lock()
            .map_err(|_| RemoteError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<RemoteDocument>, RemoteError> {
        let mut state = self.lock()?;
        if let Some(reason) = state.fail_fetch.take() {
            return Err(RemoteError::Unavailable(reason));
        }

        Ok(state
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| RemoteDocument::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set(&self, collection: &str, id: &str, fields: Record) -> Result<(), RemoteError> {
        self.insert_with_id(collection, id, fields)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        if let Some(reason) = state.fail_commit.take() {
            return Err(RemoteError::Unavailable(reason));
        }

        let collection = batch.collection().to_string();
        let count = batch.len();
        let docs = state.collections.entry(collection.clone()).or_default();
        for write in batch.into_writes() {
            docs.insert(write.id, write.fields);
        }
        state.commits += 1;

        debug!("Committed {} write(s) to memory collection '{}'", count, collection);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
