//! Path-keyed blob storage for the customizable alarm document.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::StoreError;

/// Durable storage addressed by logical path.
pub trait DocumentStore {
    fn exists(&self, path: &str) -> bool;

    /// Read the whole document. Fails with [`StoreError::NotFound`] when absent.
    fn read_all(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Replace the whole document.
    fn write_all(&mut self, path: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Documents stored as files below a root directory.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a logical path (e.g. `/customizable_alarms.json`) below the root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl DocumentStore for FsDocumentStore {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn read_all(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        match std::fs::read(self.resolve(path)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(path.to_string()))
            }
            Err(source) => Err(StoreError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }

    fn write_all(&mut self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let target = self.resolve(path);
        let io_err = |source| StoreError::Io {
            path: path.to_string(),
            source,
        };

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        // Write to temp file first, then rename over the target
        let temp_path = target.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).map_err(io_err)?;
        file.write_all(bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        std::fs::rename(&temp_path, &target).map_err(io_err)?;
        Ok(())
    }
}

/// In-memory document store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    documents: Rc<RefCell<HashMap<String, Vec<u8>>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a document without going through the trait.
    pub fn insert(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.documents.borrow_mut().insert(path.to_string(), bytes.into());
    }

    /// Current contents of a document, if any.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.documents.borrow().get(path).cloned()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn exists(&self, path: &str) -> bool {
        self.documents.borrow().contains_key(path)
    }

    fn read_all(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.get(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    fn write_all(&mut self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.insert(path, bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_fs_store_roundtrip() {
        let dir = tempdir().unwrap();
        let mut store = FsDocumentStore::new(dir.path());

        assert!(!store.exists("/alarms.json"));
        assert!(matches!(
            store.read_all("/alarms.json"),
            Err(StoreError::NotFound(_))
        ));

        store.write_all("/alarms.json", b"{}").unwrap();
        assert!(store.exists("/alarms.json"));
        assert_eq!(store.read_all("/alarms.json").unwrap(), b"{}");
        assert!(dir.path().join("alarms.json").is_file());
        assert!(!dir.path().join("alarms.tmp").exists());
    }

    #[test]
    fn test_fs_store_overwrites_and_creates_parents() {
        let dir = tempdir().unwrap();
        let mut store = FsDocumentStore::new(dir.path().join("nested").join("data"));

        store.write_all("/doc.json", b"first").unwrap();
        store.write_all("/doc.json", b"second").unwrap();
        assert_eq!(store.read_all("/doc.json").unwrap(), b"second");
    }

    #[test]
    fn test_memory_store_clones_share_contents() {
        let store = MemoryDocumentStore::new();
        let mut writer = store.clone();

        writer.write_all("/doc.json", b"hello").unwrap();
        assert!(store.exists("/doc.json"));
        assert_eq!(store.get("/doc.json").as_deref(), Some(&b"hello"[..]));
    }
}
