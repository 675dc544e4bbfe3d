//! Storage backend trait definition.

use crate::error::StorageResult;

/// A whole-document storage backend.
///
/// The local buffer rewrites its entire document on every mutation, so
/// backends only need to hand back the last document written and replace it
/// atomically enough that a reader never observes a half-written file.
///
/// # Invariants
///
/// - `read_all` returns `None` until the first successful `write_all`
/// - `read_all` returns exactly the bytes of the last successful `write_all`
/// - A failed `write_all` leaves the previous document readable
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads the full stored document.
    ///
    /// Returns `Ok(None)` if nothing has been written yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists but cannot be read.
    fn read_all(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the stored document with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. The previous document is kept.
    fn write_all(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Returns the size of the stored document in bytes (0 if absent).
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Returns true if a document has been written.
    fn exists(&self) -> bool;
}
