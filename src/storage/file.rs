//! Storage in a single JSON document on disk.
//!
//! Every write rewrites the whole document through a temporary file and a
//! rename, so readers never observe a half-written file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::trace;

use super::Storage;
use crate::error::{Error, Result};

pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty store.
    async fn load(&self) -> Result<Map<String, Value>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| Error::StorageRead {
            key: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    async fn store(&self, document: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(document)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        trace!(path = %self.path.display(), keys = document.len(), "storage file written");
        Ok(())
    }
}

impl Storage for FileStorage {
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        Ok(keys
            .iter()
            .filter_map(|key| document.remove(key).map(|value| (key.clone(), value)))
            .collect())
    }

    async fn set(&self, items: HashMap<String, Value>) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        document.extend(items);
        self.store(&document).await
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        let before = document.len();
        for key in keys {
            document.remove(key);
        }
        if document.len() == before {
            return Ok(());
        }
        self.store(&document).await
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
