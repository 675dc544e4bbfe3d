//! Inspect command implementation.

use super::load_document;
use chrono::{DateTime, Utc};
use linksync_core::BufferDocument;
use serde::Serialize;
use std::path::Path;

/// Buffer inspection result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectResult {
    /// Buffer path.
    pub path: String,
    /// File size in bytes.
    pub file_size: u64,
    /// Number of records.
    pub records: usize,
    /// Number of active records.
    pub active: usize,
    /// Number of records awaiting reconciliation.
    pub pending: usize,
    /// Next locally generated id.
    pub next_id: u64,
    /// Time of the last rewrite.
    pub last_update: Option<DateTime<Utc>>,
}

impl InspectResult {
    /// Summarizes a parsed buffer.
    pub fn from_document(path: &Path, file_size: u64, doc: &BufferDocument) -> Self {
        Self {
            path: path.display().to_string(),
            file_size,
            records: doc.records.len(),
            active: doc.records.iter().filter(|r| r.active).count(),
            pending: doc.records.iter().filter(|r| r.active && r.pending).count(),
            next_id: doc.next_id,
            last_update: doc.last_update,
        }
    }
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (doc, size) = load_document(path)?;
    let result = InspectResult::from_document(path, size, &doc);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => print_text_output(&result),
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("linksync buffer: {}", result.path);
    println!();
    println!("File size:    {} bytes", result.file_size);
    println!("Records:      {}", result.records);
    println!("  Active:     {}", result.active);
    println!("  Pending:    {}", result.pending);
    println!("Next id:      {}", result.next_id);
    match result.last_update {
        Some(ts) => println!("Last update:  {}", ts.to_rfc3339()),
        None => println!("Last update:  never"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linksync_core::{LinkBuffer, LinkDraft};
    use linksync_storage::FileBackend;
    use tempfile::tempdir;

    #[test]
    fn summarizes_buffer_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("links.json");
        let buffer = LinkBuffer::open(Box::new(FileBackend::open(&path).unwrap()));
        buffer
            .create(LinkDraft::new("A", "https://a.com/i.ico", "https://a.com"))
            .unwrap();
        buffer
            .create(LinkDraft::new("B", "https://b.com/i.ico", "https://b.com"))
            .unwrap();

        let (doc, size) = load_document(&path).unwrap();
        let result = InspectResult::from_document(&path, size, &doc);
        assert_eq!(result.records, 2);
        assert_eq!(result.pending, 2);
        assert_eq!(result.next_id, 3);
        assert!(result.file_size > 0);
        assert!(result.last_update.is_some());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(run(&dir.path().join("absent.json"), "text").is_err());
    }
}
