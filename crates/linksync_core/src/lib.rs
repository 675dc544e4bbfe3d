//! # linksync core
//!
//! Link records, their validation rules, and the local buffer that request
//! handlers read and mutate.
//!
//! This crate provides:
//! - [`LinkRecord`] and its remote representation [`LinkDocument`]
//! - Input types ([`LinkDraft`], [`LinkPatch`], [`PositionUpdate`]) with validation
//! - [`LinkBuffer`], a whole-file JSON buffer with a per-record `pending` flag
//! - [`TtlCache`], a small expiring cache with explicit invalidation
//!
//! ## Key Invariants
//!
//! - `pending` never leaves this process; the remote store only sees [`LinkDocument`]
//! - Every buffer mutation rewrites the whole document before it becomes visible
//! - A failed validation or write leaves the buffer exactly as it was

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod cache;
mod error;
mod link;

pub use buffer::{BufferDocument, LinkBuffer, PushedVersion};
pub use cache::{CacheStats, InvalidationHook, TtlCache};
pub use error::{CoreError, CoreResult};
pub use link::{LinkDocument, LinkDraft, LinkPatch, LinkRecord, PositionUpdate};

/// Crate version, reported by the CLI and the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
