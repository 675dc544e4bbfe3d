//! Remote store abstraction.

use crate::error::{SyncError, SyncResult};
use chrono::Utc;
use linksync_core::LinkDocument;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A remote store holds the authoritative copy of one user's links.
///
/// This trait abstracts the backing service, allowing for different
/// implementations (REST over HTTP, in-memory for tests, etc.).
///
/// Every method is blocking. Implementations report an unreachable store as
/// [`SyncError::RemoteUnavailable`] and a refused single-document operation
/// as [`SyncError::RemoteRejected`].
pub trait RemoteStore: Send + Sync {
    /// Lists every active document.
    fn list_all(&self) -> SyncResult<Vec<LinkDocument>>;

    /// Fetches one document, active or not.
    fn get(&self, id: &str) -> SyncResult<Option<LinkDocument>>;

    /// Creates a document. A non-empty `doc.id` is used as the document id.
    fn create(&self, doc: &LinkDocument) -> SyncResult<LinkDocument>;

    /// Replaces the fields of an existing document.
    fn update(&self, id: &str, doc: &LinkDocument) -> SyncResult<LinkDocument>;

    /// Soft-deletes a document: `active = false`, `modifiedAt = now`.
    fn delete(&self, id: &str) -> SyncResult<()>;
}

impl<R: RemoteStore + ?Sized> RemoteStore for Box<R> {
    fn list_all(&self) -> SyncResult<Vec<LinkDocument>> {
        (**self).list_all()
    }

    fn get(&self, id: &str) -> SyncResult<Option<LinkDocument>> {
        (**self).get(id)
    }

    fn create(&self, doc: &LinkDocument) -> SyncResult<LinkDocument> {
        (**self).create(doc)
    }

    fn update(&self, id: &str, doc: &LinkDocument) -> SyncResult<LinkDocument> {
        (**self).update(id, doc)
    }

    fn delete(&self, id: &str) -> SyncResult<()> {
        (**self).delete(id)
    }
}

impl<R: RemoteStore + ?Sized> RemoteStore for Arc<R> {
    fn list_all(&self) -> SyncResult<Vec<LinkDocument>> {
        (**self).list_all()
    }

    fn get(&self, id: &str) -> SyncResult<Option<LinkDocument>> {
        (**self).get(id)
    }

    fn create(&self, doc: &LinkDocument) -> SyncResult<LinkDocument> {
        (**self).create(doc)
    }

    fn update(&self, id: &str, doc: &LinkDocument) -> SyncResult<LinkDocument> {
        (**self).update(id, doc)
    }

    fn delete(&self, id: &str) -> SyncResult<()> {
        (**self).delete(id)
    }
}

/// Counters of calls made against a [`MemoryRemoteStore`].
///
/// Write counters only count successful writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteCalls {
    /// `list_all` calls.
    pub lists: u64,
    /// `get` calls.
    pub gets: u64,
    /// Successful creates.
    pub creates: u64,
    /// Successful updates.
    pub updates: u64,
    /// Successful soft deletes.
    pub deletes: u64,
}

impl RemoteCalls {
    /// Total successful writes.
    pub fn writes(&self) -> u64 {
        self.creates + self.updates + self.deletes
    }
}

#[derive(Debug, Default)]
struct Counters {
    lists: AtomicU64,
    gets: AtomicU64,
    creates: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
}

/// An in-process remote store with failure injection.
///
/// Used by tests and by the server when no remote endpoint is configured.
#[derive(Debug)]
pub struct MemoryRemoteStore {
    documents: RwLock<BTreeMap<String, LinkDocument>>,
    available: AtomicBool,
    failing: RwLock<HashSet<String>>,
    counters: Counters,
}

impl MemoryRemoteStore {
    /// Creates an empty, reachable store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
            failing: RwLock::new(HashSet::new()),
            counters: Counters::default(),
        }
    }

    /// Creates a store seeded with documents, keyed by their ids.
    pub fn with_documents(documents: impl IntoIterator<Item = LinkDocument>) -> Self {
        let store = Self::new();
        {
            let mut map = store.documents.write();
            for doc in documents {
                map.insert(doc.id.clone(), doc);
            }
        }
        store
    }

    /// Makes every call fail with [`SyncError::RemoteUnavailable`] while false.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Makes writes to one document fail with [`SyncError::RemoteRejected`].
    pub fn fail_id(&self, id: impl Into<String>) {
        self.failing.write().insert(id.into());
    }

    /// Removes all per-document failures.
    pub fn clear_failures(&self) {
        self.failing.write().clear();
    }

    /// Returns a document regardless of its `active` flag.
    pub fn document(&self, id: &str) -> Option<LinkDocument> {
        self.documents.read().get(id).cloned()
    }

    /// Returns every stored document, inactive ones included, ordered by id.
    pub fn documents(&self) -> Vec<LinkDocument> {
        self.documents.read().values().cloned().collect()
    }

    /// Returns call counters.
    pub fn calls(&self) -> RemoteCalls {
        let c = &self.counters;
        RemoteCalls {
            lists: c.lists.load(Ordering::Relaxed),
            gets: c.gets.load(Ordering::Relaxed),
            creates: c.creates.load(Ordering::Relaxed),
            updates: c.updates.load(Ordering::Relaxed),
            deletes: c.deletes.load(Ordering::Relaxed),
        }
    }

    fn check_available(&self) -> SyncResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SyncError::unavailable("memory remote store is offline"))
        }
    }

    fn check_writable(&self, id: &str) -> SyncResult<()> {
        self.check_available()?;
        if self.failing.read().contains(id) {
            return Err(SyncError::rejected(id, "write refused"));
        }
        Ok(())
    }
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn list_all(&self) -> SyncResult<Vec<LinkDocument>> {
        self.counters.lists.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        Ok(self
            .documents
            .read()
            .values()
            .filter(|d| d.active)
            .cloned()
            .collect())
    }

    fn get(&self, id: &str) -> SyncResult<Option<LinkDocument>> {
        self.counters.gets.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        Ok(self.documents.read().get(id).cloned())
    }

    fn create(&self, doc: &LinkDocument) -> SyncResult<LinkDocument> {
        let mut stored = doc.clone();
        if stored.id.is_empty() {
            stored.id = uuid::Uuid::new_v4().to_string();
        }
        self.check_writable(&stored.id)?;

        self.documents
            .write()
            .insert(stored.id.clone(), stored.clone());
        self.counters.creates.fetch_add(1, Ordering::Relaxed);
        Ok(stored)
    }

    fn update(&self, id: &str, doc: &LinkDocument) -> SyncResult<LinkDocument> {
        self.check_writable(id)?;

        let mut documents = self.documents.write();
        let existing = documents
            .get_mut(id)
            .ok_or_else(|| SyncError::rejected(id, "no such document"))?;
        let mut stored = doc.clone();
        stored.id = id.to_string();
        *existing = stored.clone();

        self.counters.updates.fetch_add(1, Ordering::Relaxed);
        Ok(stored)
    }

    fn delete(&self, id: &str) -> SyncResult<()> {
        self.check_writable(id)?;

        let mut documents = self.documents.write();
        let existing = documents
            .get_mut(id)
            .ok_or_else(|| SyncError::rejected(id, "no such document"))?;
        existing.active = false;
        existing.modified_at = Utc::now();

        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
