//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// An in-memory whole-document backend.
///
/// Clones share the same document, so a test can keep a handle for
/// inspection after moving a clone into a buffer.
///
/// # Example
///
/// ```rust
/// use linksync_storage::{StorageBackend, InMemoryBackend};
///
/// let probe = InMemoryBackend::new();
/// let mut backend = probe.clone();
/// backend.write_all(b"doc").unwrap();
/// assert_eq!(probe.data().unwrap(), b"doc");
/// assert_eq!(probe.write_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    inner: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    data: RwLock<Option<Vec<u8>>>,
    writes: AtomicU64,
    fail_writes: AtomicBool,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding a pre-existing document.
    ///
    /// Useful for testing recovery from corrupt files.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        let backend = Self::default();
        *backend.inner.data.write() = Some(data);
        backend
    }

    /// Returns a copy of the stored document.
    #[must_use]
    pub fn data(&self) -> Option<Vec<u8>> {
        self.inner.data.read().clone()
    }

    /// Returns how many writes have succeeded.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Makes every subsequent write fail with [`StorageError::Closed`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Drops the stored document.
    pub fn clear(&self) {
        *self.inner.data.write() = None;
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_all(&self) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.inner.data.read().clone())
    }

    fn write_all(&mut self, data: &[u8]) -> StorageResult<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Closed);
        }
        *self.inner.data.write() = Some(data.to_vec());
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self
            .inner
            .data
            .read()
            .as_ref()
            .map(|d| d.len() as u64)
            .unwrap_or(0))
    }

    fn exists(&self) -> bool {
        self.inner.data.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.size().unwrap(), 0);
        assert!(backend.read_all().unwrap().is_none());
        assert!(!backend.exists());
    }

    #[test]
    fn memory_write_replaces() {
        let mut backend = InMemoryBackend::new();
        backend.write_all(b"hello").unwrap();
        backend.write_all(b"world!").unwrap();

        assert_eq!(backend.read_all().unwrap().unwrap(), b"world!");
        assert_eq!(backend.size().unwrap(), 6);
        assert_eq!(backend.write_count(), 2);
    }

    #[test]
    fn memory_with_data() {
        let backend = InMemoryBackend::with_data(b"preloaded".to_vec());
        assert!(backend.exists());
        assert_eq!(backend.size().unwrap(), 9);
        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn memory_failed_write_keeps_previous() {
        let mut backend = InMemoryBackend::new();
        backend.write_all(b"first").unwrap();

        backend.set_fail_writes(true);
        let result = backend.write_all(b"second");
        assert!(matches!(result, Err(StorageError::Closed)));
        assert_eq!(backend.data().unwrap(), b"first");

        backend.set_fail_writes(false);
        backend.write_all(b"third").unwrap();
        assert_eq!(backend.data().unwrap(), b"third");
    }

    #[test]
    fn memory_clones_share_document() {
        let probe = InMemoryBackend::new();
        let mut writer = probe.clone();
        writer.write_all(b"shared").unwrap();

        assert_eq!(probe.data().unwrap(), b"shared");
        probe.clear();
        assert!(!writer.exists());
    }
}
