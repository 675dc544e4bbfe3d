//! CLI command implementations.

pub mod inspect;
pub mod pending;
pub mod serve;
pub mod verify;

use linksync_core::BufferDocument;
use linksync_storage::{FileBackend, StorageBackend};
use std::path::{Path, PathBuf};

/// Resolves the buffer file: flag, then `LINKSYNC_BUFFER`, then the default.
pub fn buffer_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os("LINKSYNC_BUFFER").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data/links.json"))
}

/// Reads and parses a buffer file. Returns the document and the file size.
pub fn load_document(path: &Path) -> Result<(BufferDocument, u64), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No buffer found at {:?}", path).into());
    }
    let backend = FileBackend::open(path)?;
    let size = backend.size()?;
    let bytes = backend.read_all()?.unwrap_or_default();
    let doc = BufferDocument::from_slice(&bytes)?;
    Ok((doc, size))
}
