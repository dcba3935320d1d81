//! Local persistence: key-value backends, the encrypted store, and the
//! stores built on top of it.

pub mod assets;
pub mod config;
pub mod encrypted;
pub mod notifications;

pub use encrypted::EncryptedStore;

use crate::error::StorageError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// A flat string key-value store — the browser local-storage analogue.
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory backend, mainly for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryBackend {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.read().expect("backend lock").get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .write()
            .expect("backend lock")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.items.write().expect("backend lock").remove(key);
        Ok(())
    }
}

/// File-backed backend: one JSON object per store file, rewritten on
/// every mutation. Values are already encrypted by the layer above.
pub struct FileBackend {
    path: PathBuf,
    items: RwLock<HashMap<String, String>>,
}

impl FileBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let items = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(StorageError::Backend(e.to_string())),
        };
        Ok(Self {
            path,
            items: RwLock::new(items),
        })
    }

    fn flush(&self, items: &HashMap<String, String>) -> Result<(), StorageError> {
        let contents = serde_json::to_string(items)?;
        std::fs::write(&self.path, contents).map_err(|e| StorageError::Backend(e.to_string()))
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.read().expect("backend lock").get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.write().expect("backend lock");
        items.insert(key.to_string(), value.to_string());
        self.flush(&items)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.write().expect("backend lock");
        items.remove(key);
        self.flush(&items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_round_trip() {
        let backend = MemoryBackend::new();
        assert!(backend.get("k").unwrap().is_none());
        backend.set("k", "v").unwrap();
        assert_eq!(backend.get("k").unwrap().as_deref(), Some("v"));
        backend.remove("k").unwrap();
        assert!(backend.get("k").unwrap().is_none());
    }

    #[test]
    fn test_file_backend_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let backend = FileBackend::open(&path).unwrap();
        backend.set("assets", "blob").unwrap();
        drop(backend);

        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.get("assets").unwrap().as_deref(), Some("blob"));
    }
}
