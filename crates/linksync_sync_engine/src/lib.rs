//! # linksync sync engine
//!
//! Reconciliation between the local link buffer and a remote document store.
//!
//! This crate provides:
//! - The [`RemoteStore`] adapter trait, with in-memory and HTTP implementations
//! - The [`SyncEngine`] reconciler with its throttle and run queue
//! - The [`SyncLog`] ring buffer of reconciliation events
//! - A [`SyncScheduler`] that triggers reconciliation periodically
//!
//! ## Architecture
//!
//! A reconciliation run has three phases:
//! 1. Push every pending local record (remote update if present, create otherwise)
//! 2. Soft-delete remote records that no longer exist locally
//! 3. Clear the `pending` flag of every record whose push was confirmed
//!
//! ## Key Invariants
//!
//! - `pending` is cleared only after a confirmed remote write of that version
//! - A per-record failure skips the record; the run continues
//! - An unreachable remote aborts the run and leaves every flag untouched
//! - Runs never overlap: manual triggers queue, periodic triggers skip

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod log;
mod remote;
mod scheduler;
mod state;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use http::{
    HttpClient, HttpMethod, HttpRemoteStore, HttpRequest, HttpResponse, LoopbackClient,
    LoopbackServer,
};
pub use log::{DatabaseChange, LogEntry, LogKind, SyncLog};
pub use remote::{MemoryRemoteStore, RemoteCalls, RemoteStore};
pub use scheduler::SyncScheduler;
pub use state::{
    LoadOutcome, ReconcileReport, SkipReason, SyncEngine, SyncOutcome, SyncStats, SyncStatus,
    SyncTrigger,
};
