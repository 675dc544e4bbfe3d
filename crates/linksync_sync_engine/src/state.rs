//! Reconciliation engine.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::log::{DatabaseChange, SyncLog};
use crate::remote::RemoteStore;
use chrono::{DateTime, Utc};
use linksync_core::{InvalidationHook, LinkBuffer, LinkRecord, PushedVersion};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// What started a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// An explicit request (API call or CLI).
    Manual,
    /// The periodic scheduler.
    Periodic,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTrigger::Manual => f.write_str("manual"),
            SyncTrigger::Periodic => f.write_str("periodic"),
        }
    }
}

/// Why a run did not execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another run held the run lock.
    InProgress,
    /// The previous run was too recent and nothing is pending.
    Throttled {
        /// Time until the throttle window closes.
        retry_in: Duration,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InProgress => f.write_str("a sync is already in progress"),
            SkipReason::Throttled { retry_in } => {
                write!(f, "last sync was too recent, retry in {}s", retry_in.as_secs())
            }
        }
    }
}

/// Counts from one executed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Remote documents created.
    pub created: usize,
    /// Remote documents updated.
    pub updated: usize,
    /// Remote documents soft-deleted.
    pub deleted: usize,
    /// Records skipped after a rejected write.
    pub failed: usize,
    /// Pending flags cleared.
    pub cleared: usize,
    /// Wall time of the run.
    #[serde(rename = "durationMs", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl ReconcileReport {
    fn new() -> Self {
        Self {
            created: 0,
            updated: 0,
            deleted: 0,
            failed: 0,
            cleared: 0,
            duration: Duration::ZERO,
        }
    }

    /// Returns true if the run wrote to the remote store or the buffer.
    pub fn changed(&self) -> bool {
        self.created + self.updated + self.deleted + self.cleared > 0
    }
}

/// Result of a reconciliation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The run executed.
    Completed(ReconcileReport),
    /// The run was skipped.
    Skipped(SkipReason),
}

impl SyncOutcome {
    /// Returns the report of an executed run.
    pub fn report(&self) -> Option<&ReconcileReport> {
        match self {
            SyncOutcome::Completed(report) => Some(report),
            SyncOutcome::Skipped(_) => None,
        }
    }

    /// Returns true if nothing ran.
    pub fn is_skipped(&self) -> bool {
        matches!(self, SyncOutcome::Skipped(_))
    }
}

/// Result of a bulk load from the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The buffer was replaced.
    Loaded {
        /// Records loaded.
        records: usize,
    },
    /// The remote store could not be read; the local buffer is kept.
    Degraded {
        /// Records in the kept buffer.
        local_records: usize,
    },
    /// The previous bulk read was too recent.
    Skipped {
        /// Time until a bulk read is allowed again.
        retry_in: Duration,
    },
}

/// Point-in-time view of the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Whether a run or a bulk load is executing.
    pub in_progress: bool,
    /// End of the last successful run.
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Records awaiting reconciliation.
    pub pending_count: usize,
    /// Most recent confirmed remote write.
    pub last_database_change: Option<DatabaseChange>,
}

/// Cumulative statistics about sync operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    /// Runs that completed.
    pub cycles_completed: u64,
    /// Runs aborted by an error.
    pub cycles_aborted: u64,
    /// Remote documents created.
    pub records_created: u64,
    /// Remote documents updated.
    pub records_updated: u64,
    /// Remote documents soft-deleted.
    pub records_deleted: u64,
    /// Per-record failures.
    pub records_failed: u64,
    /// Last error message.
    pub last_error: Option<String>,
}

enum Pushed {
    Created,
    Updated,
}

/// Holds the in-progress flag up for as long as it lives.
struct InProgress<'a>(&'a AtomicBool);

impl<'a> InProgress<'a> {
    fn mark(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Reconciles a [`LinkBuffer`] with a [`RemoteStore`].
///
/// # Concurrency
///
/// Runs are serialized by a run lock. [`SyncEngine::reconcile`] waits for the
/// lock, so concurrent manual triggers run one after another.
/// [`SyncEngine::try_reconcile`] returns immediately when a run is underway.
pub struct SyncEngine<R: RemoteStore> {
    config: SyncConfig,
    buffer: Arc<LinkBuffer>,
    remote: R,
    log: Arc<SyncLog>,
    hooks: RwLock<Vec<Arc<dyn InvalidationHook>>>,
    run_lock: Mutex<()>,
    in_progress: AtomicBool,
    last_run: RwLock<Option<Instant>>,
    last_sync_at: RwLock<Option<DateTime<Utc>>>,
    last_remote_load: RwLock<Option<Instant>>,
    stats: RwLock<SyncStats>,
}

impl<R: RemoteStore> SyncEngine<R> {
    /// Creates an engine with its own sync log.
    pub fn new(config: SyncConfig, buffer: Arc<LinkBuffer>, remote: R) -> Self {
        let log = Arc::new(SyncLog::new(config.max_log_entries));
        Self::with_log(config, buffer, remote, log)
    }

    /// Creates an engine writing to an existing sync log.
    pub fn with_log(
        config: SyncConfig,
        buffer: Arc<LinkBuffer>,
        remote: R,
        log: Arc<SyncLog>,
    ) -> Self {
        Self {
            config,
            buffer,
            remote,
            log,
            hooks: RwLock::new(Vec::new()),
            run_lock: Mutex::new(()),
            in_progress: AtomicBool::new(false),
            last_run: RwLock::new(None),
            last_sync_at: RwLock::new(None),
            last_remote_load: RwLock::new(None),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Registers a hook called after every run that changed data.
    pub fn add_invalidation_hook(&self, hook: Arc<dyn InvalidationHook>) {
        self.hooks.write().push(hook);
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the buffer.
    pub fn buffer(&self) -> &Arc<LinkBuffer> {
        &self.buffer
    }

    /// Returns the remote store.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Returns the sync log.
    pub fn log(&self) -> &Arc<SyncLog> {
        &self.log
    }

    /// Returns true while a run or a bulk load executes.
    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Returns cumulative statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns the current status.
    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            in_progress: self.is_in_progress(),
            last_sync_at: *self.last_sync_at.read(),
            pending_count: self.buffer.pending_count(),
            last_database_change: self.log.last_database_change(),
        }
    }

    /// Runs a reconciliation, waiting for any run already underway.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::RemoteUnavailable`] if the remote store cannot be
    /// reached (no flag is cleared), or [`SyncError::Buffer`] if clearing
    /// flags fails to persist.
    pub fn reconcile(&self) -> SyncResult<SyncOutcome> {
        let _guard = self.run_lock.lock();
        self.run_guarded(SyncTrigger::Manual)
    }

    /// Runs an explicitly requested reconciliation.
    ///
    /// # Errors
    ///
    /// See [`SyncEngine::reconcile`].
    pub fn manual_sync(&self) -> SyncResult<SyncOutcome> {
        self.reconcile()
    }

    /// Runs a reconciliation unless one is already underway.
    ///
    /// # Errors
    ///
    /// See [`SyncEngine::reconcile`].
    pub fn try_reconcile(&self) -> SyncResult<SyncOutcome> {
        match self.run_lock.try_lock() {
            Some(_guard) => self.run_guarded(SyncTrigger::Periodic),
            None => {
                self.log.info("sync already in progress, skipping");
                Ok(SyncOutcome::Skipped(SkipReason::InProgress))
            }
        }
    }

    /// Replaces the buffer with the remote collection at startup.
    ///
    /// # Errors
    ///
    /// Only buffer persistence failures are returned; an unreachable remote
    /// yields [`LoadOutcome::Degraded`].
    pub fn initialize_from_remote(&self) -> SyncResult<LoadOutcome> {
        self.load_remote("startup")
    }

    /// Replaces the buffer with the remote collection on request.
    ///
    /// # Errors
    ///
    /// See [`SyncEngine::initialize_from_remote`].
    pub fn reload_from_remote(&self) -> SyncResult<LoadOutcome> {
        self.load_remote("reload")
    }

    fn throttled(&self) -> Option<Duration> {
        if self.buffer.pending_count() > 0 {
            return None;
        }
        let last = (*self.last_run.read())?;
        let elapsed = last.elapsed();
        (elapsed < self.config.min_sync_interval)
            .then(|| self.config.min_sync_interval - elapsed)
    }

    /// Caller must hold the run lock.
    fn run_guarded(&self, trigger: SyncTrigger) -> SyncResult<SyncOutcome> {
        if let Some(retry_in) = self.throttled() {
            debug!(%trigger, ?retry_in, "sync throttled");
            return Ok(SyncOutcome::Skipped(SkipReason::Throttled { retry_in }));
        }

        let result = {
            let _busy = InProgress::mark(&self.in_progress);
            self.run(trigger)
        };
        *self.last_run.write() = Some(Instant::now());

        let mut stats = self.stats.write();
        match &result {
            Ok(report) => {
                *self.last_sync_at.write() = Some(Utc::now());
                stats.cycles_completed += 1;
                stats.records_created += report.created as u64;
                stats.records_updated += report.updated as u64;
                stats.records_deleted += report.deleted as u64;
                stats.records_failed += report.failed as u64;
            }
            Err(e) => {
                stats.cycles_aborted += 1;
                stats.last_error = Some(e.to_string());
            }
        }
        drop(stats);

        if result.as_ref().map_or(false, ReconcileReport::changed) {
            self.invalidate_caches();
        }
        result.map(SyncOutcome::Completed)
    }

    fn run(&self, trigger: SyncTrigger) -> SyncResult<ReconcileReport> {
        let start = Instant::now();
        let mut report = ReconcileReport::new();
        info!(%trigger, "sync started");

        // Local to remote
        let pending = self.buffer.pending();
        let mut pushed = Vec::with_capacity(pending.len());
        for record in &pending {
            let confirmed = match self.push_record(record) {
                Ok((Pushed::Created, id)) => {
                    report.created += 1;
                    id
                }
                Ok((Pushed::Updated, id)) => {
                    report.updated += 1;
                    id
                }
                Err(e) if e.is_unavailable() => return Err(self.abort("push", e)),
                Err(e) => {
                    report.failed += 1;
                    self.log.error(
                        format!("failed to push link {}: {e}", record.id),
                        Some(json!({ "id": record.id, "error": e.to_string() })),
                    );
                    continue;
                }
            };
            pushed.push(PushedVersion {
                id: confirmed,
                modified_at: record.modified_at,
            });
        }

        // Deletion detection
        let remote_docs = match self.remote.list_all() {
            Ok(docs) => docs,
            Err(e) if e.is_unavailable() => return Err(self.abort("deletion detection", e)),
            Err(e) => {
                report.failed += 1;
                self.log.error(
                    format!("could not list remote links, deletion detection skipped: {e}"),
                    Some(json!({ "error": e.to_string() })),
                );
                Vec::new()
            }
        };
        let local_ids = self.buffer.ids();
        for doc in remote_docs.iter().filter(|d| !local_ids.contains(&d.id)) {
            match self.remote.delete(&doc.id) {
                Ok(()) => {
                    report.deleted += 1;
                    self.log.database_change(
                        format!("link {} marked deleted in remote store", doc.id),
                        Some(json!({ "id": doc.id, "operation": "delete" })),
                    );
                }
                Err(e) if e.is_unavailable() => {
                    return Err(self.abort("deletion detection", e))
                }
                Err(e) => {
                    report.failed += 1;
                    self.log.error(
                        format!("failed to delete remote link {}: {e}", doc.id),
                        Some(json!({ "id": doc.id, "error": e.to_string() })),
                    );
                }
            }
        }

        // Flag clearing
        report.cleared = match self.buffer.clear_pending(&pushed) {
            Ok(cleared) => cleared,
            Err(e) => return Err(self.abort("flag clearing", SyncError::Buffer(e))),
        };

        report.duration = start.elapsed();
        self.log.success(
            format!(
                "sync completed: {} created, {} updated, {} deleted, {} failed",
                report.created, report.updated, report.deleted, report.failed
            ),
            Some(json!({
                "created": report.created,
                "updated": report.updated,
                "deleted": report.deleted,
                "failed": report.failed,
            })),
        );
        Ok(report)
    }

    /// Returns the id under which the remote store confirmed the record.
    fn push_record(&self, record: &LinkRecord) -> SyncResult<(Pushed, String)> {
        let doc = record.to_document();
        if self.remote.get(&record.id)?.is_some() {
            self.remote.update(&record.id, &doc)?;
            self.log.database_change(
                format!("link {} updated in remote store", record.id),
                Some(json!({ "id": record.id, "operation": "update", "name": record.name })),
            );
            return Ok((Pushed::Updated, record.id.clone()));
        }

        let created = self.remote.create(&doc)?;
        self.log.database_change(
            format!("link {} created in remote store", record.id),
            Some(json!({ "id": record.id, "operation": "create", "name": record.name })),
        );
        if created.id.is_empty() || created.id == record.id {
            return Ok((Pushed::Created, record.id.clone()));
        }

        // The store picked its own id. Deletion detection matches on it.
        self.buffer.rekey(&record.id, &created.id)?;
        info!(from = %record.id, to = %created.id, "link re-keyed to remote id");
        Ok((Pushed::Created, created.id))
    }

    fn abort(&self, phase: &str, err: SyncError) -> SyncError {
        self.log.error(
            format!("sync aborted during {phase}: {err}"),
            Some(json!({ "phase": phase, "error": err.to_string() })),
        );
        err
    }

    fn load_remote(&self, reason: &str) -> SyncResult<LoadOutcome> {
        let _guard = self.run_lock.lock();

        if let Some(last) = *self.last_remote_load.read() {
            let elapsed = last.elapsed();
            if elapsed < self.config.remote_load_interval {
                let retry_in = self.config.remote_load_interval - elapsed;
                debug!(reason, ?retry_in, "remote load skipped");
                return Ok(LoadOutcome::Skipped { retry_in });
            }
        }

        let _busy = InProgress::mark(&self.in_progress);
        let documents = match self.remote.list_all() {
            Ok(documents) => documents,
            Err(e) => {
                let local_records = self.buffer.len();
                self.log.error(
                    format!("could not load links from remote store, using local buffer: {e}"),
                    Some(json!({ "reason": reason, "localRecords": local_records })),
                );
                return Ok(LoadOutcome::Degraded { local_records });
            }
        };

        let records = self.buffer.load_from_remote(documents)?;
        *self.last_remote_load.write() = Some(Instant::now());
        self.log.success(
            format!("loaded {records} links from remote store"),
            Some(json!({ "reason": reason, "records": records })),
        );
        self.invalidate_caches();
        Ok(LoadOutcome::Loaded { records })
    }

    fn invalidate_caches(&self) {
        for hook in self.hooks.read().iter() {
            hook.invalidate_all();
        }
    }
}
