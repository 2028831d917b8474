//! Storage backends
//!
//! A [`Storage`] is a string key/value store. The persistence plugin writes
//! one JSON document per key.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;

/// Key/value text storage
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the text stored under `key`
    async fn get_item(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Store `value` under `key`, replacing what was there
    async fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// In-memory storage. Thread-safe; wrap in an `Arc` to keep a handle for
/// assertions after handing it to a plugin.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an item
    pub fn with_item(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.lock().insert(key.into(), value.into());
        self
    }

    /// The text stored under `key`
    pub fn item(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Copy of every stored item
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.item(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStorage
// ---------------------------------------------------------------------------

/// One `<key>.json` file per key inside a directory.
///
/// The directory is created on the first write.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Keys must be plain file stems.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let plain = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\']);
        if !plain {
            return Err(Error::Storage(format!("invalid storage key '{key}'")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).await?;

        // Write beside the target and rename so readers never see a torn file.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value).await?;
        fs::rename(&staging, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.read(key).await?)
    }

    async fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        Ok(self.write(key, value).await?)
    }
}

// ---------------------------------------------------------------------------
// Arc<S> blanket, lets tests keep a handle on the storage
// ---------------------------------------------------------------------------

#[async_trait]
impl<S: Storage + ?Sized> Storage for Arc<S> {
    async fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).set_item(key, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new().with_item("seed", "1");
        assert_eq!(storage.get_item("seed").await.unwrap().as_deref(), Some("1"));
        assert_eq!(storage.get_item("missing").await.unwrap(), None);

        storage.set_item("seed", "2").await.unwrap();
        assert_eq!(storage.snapshot().get("seed").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn test_file_storage_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert_eq!(storage.get_item("cask").await.unwrap(), None);
        storage.set_item("cask", r#"{"a":1}"#).await.unwrap();

        let on_disk = std::fs::read_to_string(dir.path().join("nested/cask.json")).unwrap();
        assert_eq!(on_disk, r#"{"a":1}"#);
        assert_eq!(
            storage.get_item("cask").await.unwrap().as_deref(),
            Some(r#"{"a":1}"#)
        );
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let storage = FileStorage::new("state");
        assert!(storage.path_for("../escape").is_err());
        assert!(storage.path_for("").is_err());
        assert_eq!(
            storage.path_for("cask").unwrap(),
            PathBuf::from("state").join("cask.json")
        );
    }

    #[tokio::test]
    async fn test_arc_blanket_shares_items() {
        let shared = Arc::new(MemoryStorage::new());
        let handle: Box<dyn Storage> = Box::new(Arc::clone(&shared));

        handle.set_item("k", "v").await.unwrap();
        assert_eq!(shared.item("k").as_deref(), Some("v"));
    }
}
