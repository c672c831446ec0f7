//! File store capability
//!
//! Templates, worker sources, datacenter lists and the run report go through
//! `FileStore`, so workflows can run against a directory or purely in memory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::FileStoreError;

/// File access used by the workflows
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>, FileStoreError>;
    async fn write_bytes(&self, path: &str, data: &[u8]) -> Result<(), FileStoreError>;
    async fn exists(&self, path: &str) -> bool;

    async fn read_to_string(&self, path: &str) -> Result<String, FileStoreError> {
        let bytes = self.read_bytes(path).await?;
        String::from_utf8(bytes).map_err(|_| FileStoreError::InvalidUtf8 {
            path: PathBuf::from(path),
        })
    }

    async fn write_string(&self, path: &str, content: &str) -> Result<(), FileStoreError> {
        self.write_bytes(path, content.as_bytes()).await
    }
}

/// Shared file store reference
pub type SharedFileStore = Arc<dyn FileStore>;

/// Files on disk; relative paths resolve against `root`.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at the process working directory.
    pub fn current_dir() -> Self {
        Self::new(".")
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>, FileStoreError> {
        let full = self.resolve(path);
        tokio::fs::read(&full).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                FileStoreError::NotFound { path: full.clone() }
            } else {
                FileStoreError::Io {
                    path: full.clone(),
                    source,
                }
            }
        })
    }

    async fn write_bytes(&self, path: &str, data: &[u8]) -> Result<(), FileStoreError> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| FileStoreError::Io {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }
        tokio::fs::write(&full, data)
            .await
            .map_err(|source| FileStoreError::Io { path: full, source })
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.resolve(path))
            .await
            .unwrap_or(false)
    }
}

/// In-memory files, keyed by the path string as given.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.to_string(), content.into());
        }
        self
    }

    /// Current content of `path`, if any.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .ok()
            .and_then(|files| files.get(path).cloned())
    }
}

fn poisoned(path: &str, reason: String) -> FileStoreError {
    FileStoreError::Io {
        path: PathBuf::from(path),
        source: std::io::Error::other(reason),
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>, FileStoreError> {
        let files = self.files.lock().map_err(|e| poisoned(path, e.to_string()))?;
        files.get(path).cloned().ok_or_else(|| FileStoreError::NotFound {
            path: PathBuf::from(path),
        })
    }

    async fn write_bytes(&self, path: &str, data: &[u8]) -> Result<(), FileStoreError> {
        let mut files = self.files.lock().map_err(|e| poisoned(path, e.to_string()))?;
        files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        assert!(!store.exists("nested/result.json").await);
        store.write_string("nested/result.json", "{}").await.unwrap();
        assert!(store.exists("nested/result.json").await);
        assert_eq!(store.read_to_string("nested/result.json").await.unwrap(), "{}");
        assert!(dir.path().join("nested/result.json").is_file());
    }

    #[tokio::test]
    async fn test_local_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        assert!(matches!(
            store.read_bytes("missing.json").await,
            Err(FileStoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_local_store_absolute_paths_ignore_root() {
        let dir = tempfile::tempdir().unwrap();
        let absolute = dir.path().join("abs.txt");
        let store = LocalFileStore::new("/nonexistent-root");

        store
            .write_string(absolute.to_str().unwrap(), "x")
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&absolute).unwrap(), "x");
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryFileStore::new().with_file("a.txt", "hello");
        assert_eq!(store.read_to_string("a.txt").await.unwrap(), "hello");

        store.write_bytes("b.bin", &[0xff, 0xfe]).await.unwrap();
        assert!(store.exists("b.bin").await);
        assert!(matches!(
            store.read_to_string("b.bin").await,
            Err(FileStoreError::InvalidUtf8 { .. })
        ));
        assert!(matches!(
            store.read_bytes("c").await,
            Err(FileStoreError::NotFound { .. })
        ));
    }
}
