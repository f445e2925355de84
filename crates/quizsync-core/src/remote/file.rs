//! Remote store backed by a JSON file
//!
//! File layout: `{ "<collection>": { "<id>": { ...fields } } }`. Every
//! write rewrites the whole file through a temp file and rename, so a
//! failed commit leaves the previous file in place.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{RemoteError, RemoteStore, WriteBatch};
use crate::document::{Record, RemoteDocument};

type Collections = BTreeMap<String, BTreeMap<String, Record>>;

/// A document store kept in a single JSON file
pub struct JsonFileRemote {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl JsonFileRemote {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file; a missing file is an empty store
    fn load(&self) -> Result<Collections, RemoteError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Collections::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Collections::new()),
            Err(e) => Err(RemoteError::io(&self.path, e)),
        }
    }

    fn store(&self, collections: &Collections) -> Result<(), RemoteError> {
        let data = serde_json::to_vec_pretty(collections)?;
        atomic_write(&self.path, &data)
    }
}

#[async_trait]
impl RemoteStore for JsonFileRemote {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<RemoteDocument>, RemoteError> {
        let mut collections = self.load()?;
        Ok(collections
            .remove(collection)
            .unwrap_or_default()
            .into_iter()
            .map(|(id, fields)| RemoteDocument::new(id, fields))
            .collect())
    }

    async fn set(&self, collection: &str, id: &str, fields: Record) -> Result<(), RemoteError> {
        let _lock = self.write_lock.lock().await;
        let mut collections = self.load()?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        self.store(&collections)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), RemoteError> {
        let _lock = self.write_lock.lock().await;
        let mut collections = self.load()?;

        let collection = batch.collection().to_string();
        let count = batch.len();
        let docs = collections.entry(collection.clone()).or_default();
        for write in batch.into_writes() {
            docs.insert(write.id, write.fields);
        }

        self.store(&collections)?;
        debug!(
            "Committed {} write(s) to '{}' in {:?}",
            count, collection, self.path
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Write data to a file atomically (temp file + fsync + rename)
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), RemoteError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| RemoteError::io(parent, e))?;
        }
    }

    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path).map_err(|e| RemoteError::io(&temp_path, e))?;
    file.write_all(data)
        .map_err(|e| RemoteError::io(&temp_path, e))?;
    file.sync_all().map_err(|e| RemoteError::io(&temp_path, e))?;

    fs::rename(&temp_path, path).map_err(|e| RemoteError::io(path, e))?;
    Ok(())
}
