//! File-based storage backend for the persisted buffer.

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file-based whole-document backend.
///
/// Writes go to a sibling temporary file which is synced and then renamed
/// over the target, so a crash mid-write leaves the previous document intact.
///
/// # Example
///
/// ```no_run
/// use linksync_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("links.json")).unwrap();
/// backend.write_all(b"{}").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Opens a file backend at the given path.
    ///
    /// The file is not created until the first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the path exists but is not a regular file.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if path.exists() && !path.is_file() {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            )
            .into());
        }

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Opens a file backend, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Self::open(path)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StorageBackend for FileBackend {
    fn read_all(&self) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> StorageResult<()> {
        let temp = self.temp_path();

        {
            let mut file = File::create(&temp)?;
            file.write_all(data)?;
            file.sync_all()?;
        }

        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        debug!(path = %self.path.display(), bytes = data.len(), "buffer file rewritten");
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_absent_reads_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("links.json");

        let backend = FileBackend::open(&path).unwrap();
        assert!(backend.read_all().unwrap().is_none());
        assert_eq!(backend.size().unwrap(), 0);
        assert!(!backend.exists());
        assert!(!path.exists());
    }

    #[test]
    fn file_write_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("links.json");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.write_all(b"hello world").unwrap();

        assert!(backend.exists());
        assert_eq!(backend.size().unwrap(), 11);
        assert_eq!(backend.read_all().unwrap().unwrap(), b"hello world");
    }

    #[test]
    fn file_write_replaces_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("links.json");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.write_all(b"a much longer first document").unwrap();
        backend.write_all(b"short").unwrap();

        assert_eq!(backend.read_all().unwrap().unwrap(), b"short");
        assert_eq!(backend.size().unwrap(), 5);
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("links.json");

        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.write_all(b"persistent data").unwrap();
        }

        {
            let backend = FileBackend::open(&path).unwrap();
            assert_eq!(backend.read_all().unwrap().unwrap(), b"persistent data");
        }
    }

    #[test]
    fn file_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("links.json");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.write_all(b"{}").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn file_create_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data").join("links.json");

        let mut backend = FileBackend::open_with_create_dirs(&path).unwrap();
        backend.write_all(b"{}").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn file_open_directory_fails() {
        let dir = tempdir().unwrap();
        assert!(FileBackend::open(dir.path()).is_err());
    }

    #[test]
    fn file_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("links.json");

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.path(), path);
    }
}
