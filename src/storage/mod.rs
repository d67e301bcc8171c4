//! File storage capability and the sidecar persistence built on it.
//!
//! Writes through [`FsFileStore`] go to a temporary file in the target
//! directory and are renamed over the destination, so a crash mid-write
//! never replaces a good file with a truncated one.

pub mod sidecar;

pub use sidecar::*;

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::InvalidFormat(_) | StoreError::Json(_) => ErrorKind::InvalidFormat,
            StoreError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            StoreError::Io(_) => ErrorKind::IoFailure,
        }
    }
}

/// Read/write access to named byte blobs.
pub trait FileStore: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<u8>, StoreError>;

    /// Replace the content at `path`. Implementations must never leave a
    /// partially written file at `path`.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError>;

    fn exists(&self, path: &Path) -> bool;
}

/// Local filesystem store.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsFileStore;

impl FileStore for FsFileStore {
    fn read(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound(path.to_path_buf()),
            _ => StoreError::Io(e),
        })
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        write_atomic(path, bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Write `bytes` to a temp file beside `path`, then rename it into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "File written");
    Ok(())
}

/// Directory a file lives in; `.` for bare file names.
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// In-memory store for hosts without a writable filesystem, and for tests.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    fail_writes: Mutex<bool>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with an IO error (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_writes.lock() {
            *flag = fail;
        }
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl FileStore for MemoryFileStore {
    fn read(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        let files = self
            .files
            .lock()
            .map_err(|_| StoreError::Io(std::io::Error::other("store lock poisoned")))?;
        files
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes.lock().map(|f| *f).unwrap_or(false) {
            return Err(StoreError::Io(std::io::Error::other("write refused")));
        }
        let mut files = self
            .files
            .lock()
            .map_err(|_| StoreError::Io(std::io::Error::other("store lock poisoned")))?;
        files.insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_store_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/dir/file.json");
        let store = FsFileStore;

        assert!(!store.exists(&path));
        store.write(&path, b"{}").unwrap();
        assert!(store.exists(&path));
        assert_eq!(store.read(&path).unwrap(), b"{}");

        store.write(&path, b"[1]").unwrap();
        assert_eq!(store.read(&path).unwrap(), b"[1]");
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.json");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();

        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().flatten().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(std::fs::read(&path).unwrap(), b"two");
    }

    #[test]
    fn fs_store_missing_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = FsFileStore.read(&tmp.path().join("nope.pdf")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn memory_store_can_refuse_writes() {
        let store = MemoryFileStore::new();
        let path = PathBuf::from("/mem/a.json");
        store.write(&path, b"ok").unwrap();

        store.set_fail_writes(true);
        let err = store.write(&path, b"lost").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert_eq!(store.read(&path).unwrap(), b"ok");

        store.set_fail_writes(false);
        store.write(&path, b"new").unwrap();
        assert_eq!(store.read(&path).unwrap(), b"new");
    }

    #[test]
    fn parent_dir_of_bare_name_is_cwd() {
        assert_eq!(parent_dir(Path::new("a.pdf")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("/x/a.pdf")), PathBuf::from("/x"));
    }
}
