//! File stores backing read and write transfers.
//!
//! A store maps a filename to an immutable blob. Entries are created once
//! and never replaced: [`FileStore::put_if_absent`] is the only way in and
//! refuses keys that already exist.

use std::collections::HashMap;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tempfile::NamedTempFile;

pub trait FileStore: Send + Sync {
    /// Returns the blob stored under `key`, or `None` if absent.
    fn fetch(&self, key: &str) -> io::Result<Option<Arc<[u8]>>>;

    /// Atomically stores `data` under `key` unless the key already exists.
    /// Returns `false` without touching the store in that case.
    fn put_if_absent(&self, key: &str, data: Vec<u8>) -> io::Result<bool>;

    fn contains(&self, key: &str) -> io::Result<bool> {
        Ok(self.fetch(key)?.is_some())
    }
}

/// In-memory store guarded by a read/write lock.
///
/// Every critical section is a single map operation, so a poisoned lock
/// still guards a consistent map and is recovered.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RwLock<HashMap<String, Arc<[u8]>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileStore for MemoryStore {
    fn fetch(&self, key: &str) -> io::Result<Option<Arc<[u8]>>> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        Ok(files.get(key).cloned())
    }

    fn put_if_absent(&self, key: &str, data: Vec<u8>) -> io::Result<bool> {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        if files.contains_key(key) {
            return Ok(false);
        }
        files.insert(key.to_string(), Arc::from(data));
        Ok(true)
    }

    fn contains(&self, key: &str) -> io::Result<bool> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        Ok(files.contains_key(key))
    }
}

/// Store backed by a directory tree.
///
/// Keys are relative paths below the root. New files are written to a
/// temporary file next to their destination and linked into place only if
/// the name is still free, so a half written file is never visible.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(io::Error::new(
                ErrorKind::NotFound,
                format!("directory does not exist: {}", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a key to a path, refusing anything that could leave the root.
    fn resolve(&self, key: &str) -> io::Result<PathBuf> {
        let relative = Path::new(key);
        let confined = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !confined {
            return Err(io::Error::new(
                ErrorKind::PermissionDenied,
                format!("access outside of store: {}", key),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl FileStore for DirStore {
    fn fetch(&self, key: &str) -> io::Result<Option<Arc<[u8]>>> {
        let path = self.resolve(key)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(Arc::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) if path.is_dir() => Err(io::Error::new(ErrorKind::PermissionDenied, e)),
            Err(e) => Err(e),
        }
    }

    fn put_if_absent(&self, key: &str, data: Vec<u8>) -> io::Result<bool> {
        let path = self.resolve(key)?;
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)?;

        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(&data)?;
        file.as_file().sync_all()?;

        match file.persist_noclobber(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.error),
        }
    }

    fn contains(&self, key: &str) -> io::Result<bool> {
        Ok(self.resolve(key)?.is_file())
    }
}
