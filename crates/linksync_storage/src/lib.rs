//! # linksync storage
//!
//! Storage backends for the linksync local buffer.
//!
//! Backends are **opaque whole-document stores**: every write replaces the
//! previous contents entirely, and a read returns the full document. They do
//! not interpret the bytes they hold; the buffer owns the JSON format.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For tests and ephemeral buffers
//! - [`FileBackend`] - For the persisted buffer file
//!
//! ## Example
//!
//! ```rust
//! use linksync_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! assert!(backend.read_all().unwrap().is_none());
//!
//! backend.write_all(b"{\"records\":[]}").unwrap();
//! assert_eq!(backend.read_all().unwrap().unwrap(), b"{\"records\":[]}");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
