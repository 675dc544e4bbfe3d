//! File-backed local buffer of link records.

use crate::error::{CoreError, CoreResult};
use crate::link::{
    validate_position, LinkDocument, LinkDraft, LinkPatch, LinkRecord, PositionUpdate,
};
use chrono::{DateTime, Utc};
use linksync_storage::{InMemoryBackend, StorageBackend};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// The persisted form of the buffer.
///
/// ```json
/// { "records": [...], "nextId": 4, "lastUpdate": "2026-01-01T00:00:00Z" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferDocument {
    /// All records, including inactive ones.
    #[serde(default)]
    pub records: Vec<LinkRecord>,
    /// Next local sequential id.
    #[serde(default = "first_id")]
    pub next_id: u64,
    /// Time of the last successful rewrite.
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

fn first_id() -> u64 {
    1
}

impl Default for BufferDocument {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            next_id: first_id(),
            last_update: None,
        }
    }
}

impl BufferDocument {
    /// Parses a buffer document from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if the bytes are not a valid document.
    pub fn from_slice(bytes: &[u8]) -> CoreResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    fn active_index(&self, id: &str) -> CoreResult<usize> {
        self.records
            .iter()
            .position(|r| r.id == id && r.active)
            .ok_or_else(|| CoreError::not_found(id))
    }

    fn next_position(&self) -> i64 {
        self.records
            .iter()
            .map(|r| r.position)
            .max()
            .map_or(0, |p| p.saturating_add(1))
    }
}

/// The version of a record that was confirmed by the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushedVersion {
    /// Record id.
    pub id: String,
    /// `modifiedAt` of the pushed snapshot.
    pub modified_at: DateTime<Utc>,
}

impl From<&LinkRecord> for PushedVersion {
    fn from(record: &LinkRecord) -> Self {
        Self {
            id: record.id.clone(),
            modified_at: record.modified_at,
        }
    }
}

struct Inner {
    backend: Box<dyn StorageBackend>,
    doc: BufferDocument,
}

/// A JSON-file-backed working copy of link records.
///
/// Every mutation clones the document, applies the change, rewrites the whole
/// backend, and only then swaps the new document in. Validation or storage
/// failures therefore leave both memory and disk untouched.
///
/// # Thread Safety
///
/// One mutex guards the document and the backend, so concurrent mutations
/// are serialized and never interleave their file rewrites.
pub struct LinkBuffer {
    inner: Mutex<Inner>,
}

impl LinkBuffer {
    /// Opens a buffer over the given backend.
    ///
    /// Absent storage yields an empty buffer. Unreadable or corrupt storage
    /// is logged and also yields an empty buffer; it is overwritten on the
    /// first mutation.
    pub fn open(backend: Box<dyn StorageBackend>) -> Self {
        let doc = match backend.read_all() {
            Ok(Some(bytes)) => match BufferDocument::from_slice(&bytes) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(error = %e, "local buffer is corrupt, starting empty");
                    BufferDocument::default()
                }
            },
            Ok(None) => BufferDocument::default(),
            Err(e) => {
                warn!(error = %e, "local buffer is unreadable, starting empty");
                BufferDocument::default()
            }
        };

        debug!(records = doc.records.len(), next_id = doc.next_id, "local buffer opened");

        Self {
            inner: Mutex::new(Inner { backend, doc }),
        }
    }

    /// Opens an empty buffer held in memory.
    pub fn in_memory() -> Self {
        Self::open(Box::new(InMemoryBackend::new()))
    }

    /// Returns active records sorted by position ascending.
    ///
    /// Records sharing a position keep their insertion order.
    pub fn load_all(&self) -> Vec<LinkRecord> {
        let inner = self.inner.lock();
        let mut records: Vec<LinkRecord> =
            inner.doc.records.iter().filter(|r| r.active).cloned().collect();
        records.sort_by_key(|r| r.position);
        records
    }

    /// Returns the active record with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no active record matches.
    pub fn get(&self, id: &str) -> CoreResult<LinkRecord> {
        let inner = self.inner.lock();
        let idx = inner.doc.active_index(id)?;
        Ok(inner.doc.records[idx].clone())
    }

    /// Validates and appends a new pending record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for bad input, or a storage error if
    /// the rewrite fails. Nothing is persisted in either case.
    pub fn create(&self, draft: LinkDraft) -> CoreResult<LinkRecord> {
        let draft = draft.validate()?;

        let record = self.mutate(|doc| {
            let now = Utc::now();
            let record = LinkRecord {
                id: doc.next_id.to_string(),
                name: draft.name,
                icon_url: draft.icon_url,
                destination_url: draft.destination_url,
                position: draft.position.unwrap_or_else(|| doc.next_position()),
                created_at: now,
                modified_at: now,
                active: true,
                pending: true,
            };
            doc.next_id += 1;
            doc.records.push(record.clone());
            Ok((record, true))
        })?;

        debug!(id = %record.id, position = record.position, "link created");
        Ok(record)
    }

    /// Merges the patch into an existing record and marks it pending.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the id is absent (the buffer and its
    /// file are left unchanged), or [`CoreError::Validation`] for bad input.
    pub fn update(&self, id: &str, patch: LinkPatch) -> CoreResult<LinkRecord> {
        let patch = patch.validate()?;

        let record = self.mutate(|doc| {
            let idx = doc.active_index(id)?;
            let record = &mut doc.records[idx];
            patch.apply_to(record);
            record.touch();
            Ok((record.clone(), true))
        })?;

        debug!(id = %record.id, "link updated");
        Ok(record)
    }

    /// Removes a record entirely (hard delete).
    ///
    /// Inactive records are removable too. Returns the removed record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no record has this id.
    pub fn delete(&self, id: &str) -> CoreResult<LinkRecord> {
        let removed = self.mutate(|doc| {
            let idx = doc.position_of(id).ok_or_else(|| CoreError::not_found(id))?;
            Ok((doc.records.remove(idx), true))
        })?;

        debug!(id = %removed.id, "link removed from local buffer");
        Ok(removed)
    }

    /// Applies a batch of position changes and persists once.
    ///
    /// The whole batch is rejected if any id is unknown or any position is
    /// negative. Returns the number of records touched.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] or [`CoreError::Validation`].
    pub fn reorder(&self, updates: &[PositionUpdate]) -> CoreResult<usize> {
        for update in updates {
            validate_position(update.position)?;
        }

        let touched = self.mutate(|doc| {
            for update in updates {
                let idx = doc.active_index(&update.id)?;
                let record = &mut doc.records[idx];
                record.position = update.position;
                record.touch();
            }
            Ok((updates.len(), !updates.is_empty()))
        })?;

        debug!(touched, "links reordered");
        Ok(touched)
    }

    /// Replaces the whole buffer with records pulled from the remote store.
    ///
    /// Every loaded record is marked reconciled. Returns the record count.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the rewrite fails.
    pub fn load_from_remote(&self, documents: Vec<LinkDocument>) -> CoreResult<usize> {
        let count = self.mutate(|doc| {
            let highest = documents
                .iter()
                .filter_map(|d| d.id.parse::<u64>().ok())
                .max()
                .unwrap_or(0);
            doc.next_id = doc.next_id.max(highest.saturating_add(1));
            doc.records = documents.into_iter().map(LinkRecord::from_document).collect();
            Ok((doc.records.len(), true))
        })?;

        info!(records = count, "local buffer replaced from remote store");
        Ok(count)
    }

    /// Returns active records awaiting reconciliation, in position order.
    pub fn pending(&self) -> Vec<LinkRecord> {
        let mut records: Vec<LinkRecord> = self
            .inner
            .lock()
            .doc
            .records
            .iter()
            .filter(|r| r.active && r.pending)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.position);
        records
    }

    /// Returns the number of active pending records.
    pub fn pending_count(&self) -> usize {
        self.inner
            .lock()
            .doc
            .records
            .iter()
            .filter(|r| r.active && r.pending)
            .count()
    }

    /// Returns the ids of every local record, active or not.
    pub fn ids(&self) -> HashSet<String> {
        self.inner
            .lock()
            .doc
            .records
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }

    /// Clears `pending` on records whose pushed version is still current.
    ///
    /// A record modified after its snapshot was taken keeps its flag so the
    /// next run pushes the newer version. The buffer is rewritten only when
    /// at least one flag changes. Returns the number of flags cleared.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the rewrite fails.
    pub fn clear_pending(&self, pushed: &[PushedVersion]) -> CoreResult<usize> {
        self.mutate(|doc| {
            let mut cleared = 0;
            for version in pushed {
                if let Some(record) = doc.records.iter_mut().find(|r| {
                    r.id == version.id && r.pending && r.modified_at == version.modified_at
                }) {
                    record.pending = false;
                    cleared += 1;
                }
            }
            Ok((cleared, cleared > 0))
        })
    }

    /// Moves a record to the id the remote store assigned to it.
    ///
    /// Every other field, `pending` included, is kept. Returns the record
    /// under its new id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if `id` is absent, or
    /// [`CoreError::Validation`] if `new_id` is empty or already taken.
    pub fn rekey(&self, id: &str, new_id: &str) -> CoreResult<LinkRecord> {
        if new_id.is_empty() {
            return Err(CoreError::validation("id", "must not be empty"));
        }

        let record = self.mutate(|doc| {
            if id == new_id {
                let idx = doc.position_of(id).ok_or_else(|| CoreError::not_found(id))?;
                return Ok((doc.records[idx].clone(), false));
            }
            if doc.position_of(new_id).is_some() {
                return Err(CoreError::validation(
                    "id",
                    format!("{new_id} is already used by another link"),
                ));
            }
            let idx = doc.position_of(id).ok_or_else(|| CoreError::not_found(id))?;
            doc.records[idx].id = new_id.to_string();
            Ok((doc.records[idx].clone(), true))
        })?;

        debug!(from = id, to = new_id, "link re-keyed");
        Ok(record)
    }

    /// Returns the time of the last successful rewrite.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().doc.last_update
    }

    /// Returns the number of records, active or not.
    pub fn len(&self) -> usize {
        self.inner.lock().doc.records.len()
    }

    /// Returns true if the buffer holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of the in-memory document.
    pub fn snapshot(&self) -> BufferDocument {
        self.inner.lock().doc.clone()
    }

    /// Runs `f` against a copy of the document and commits it if `f` reports
    /// a change and the rewrite succeeds.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut BufferDocument) -> CoreResult<(T, bool)>,
    ) -> CoreResult<T> {
        let mut inner = self.inner.lock();
        let mut doc = inner.doc.clone();

        let (out, changed) = f(&mut doc)?;
        if !changed {
            return Ok(out);
        }

        doc.last_update = Some(Utc::now());
        let bytes = serde_json::to_vec_pretty(&doc)?;
        inner.backend.write_all(&bytes)?;
        inner.doc = doc;

        Ok(out)
    }
}
