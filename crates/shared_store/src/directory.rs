//! DirectoryStore - shared store backed by a host directory
//!
//! The directory is usually bind-mounted into the worker containers, so the
//! orchestrator and the worker see the same files. Writes go to a temporary
//! sibling first and are renamed into place, so a reader never observes a
//! half-written value.

use bytes::Bytes;
use contracts::{SharedStore, StoreError, StoreKey};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Store rooted at a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    name: String,
    root: PathBuf,
}

impl DirectoryStore {
    /// Create a store rooted at `root`, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        Ok(Self {
            name: format!("dir:{}", root.display()),
            root,
        })
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of `key`
    pub fn path_for(&self, key: &StoreKey) -> PathBuf {
        key.segments()
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    async fn write_atomic(&self, key: &StoreKey, data: &[u8]) -> std::io::Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_file_name(format!(".{}.{}.tmp", key.file_name(), Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp, data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }
}

impl SharedStore for DirectoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "directory_store_put",
        skip(self, data),
        fields(store = %self.name, key = %key, bytes = data.len())
    )]
    async fn put(&self, key: &StoreKey, data: Bytes) -> Result<(), StoreError> {
        self.write_atomic(key, &data)
            .await
            .map_err(|e| StoreError::io(key.as_str(), e))?;
        debug!("Value written");
        Ok(())
    }

    #[instrument(name = "directory_store_get", skip(self), fields(store = %self.name, key = %key))]
    async fn get(&self, key: &StoreKey) -> Result<Option<Bytes>, StoreError> {
        match fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(key.as_str(), e)),
        }
    }

    async fn exists(&self, key: &StoreKey) -> bool {
        match fs::metadata(self.path_for(key)).await {
            Ok(meta) => meta.is_file(),
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                warn!(store = %self.name, key = %key, error = %e, "Probe failed");
                false
            }
        }
    }
}
