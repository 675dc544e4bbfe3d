//! Verify command implementation.

use super::load_document;
use linksync_core::{BufferDocument, LinkDraft};
use std::collections::HashSet;
use std::path::Path;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of records checked.
    pub records_checked: usize,
    /// Number of records without problems.
    pub valid_records: usize,
    /// List of problems found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks a parsed buffer for structural problems.
pub fn verify_document(doc: &BufferDocument) -> VerifyResult {
    let mut result = VerifyResult::default();
    let mut seen = HashSet::new();

    for record in &doc.records {
        result.records_checked += 1;
        let before = result.errors.len();

        if !seen.insert(record.id.as_str()) {
            result.errors.push(format!("Duplicate id {:?}", record.id));
        }

        if let Ok(numeric) = record.id.parse::<u64>() {
            if numeric >= doc.next_id {
                result.errors.push(format!(
                    "Record {} is not below nextId {}",
                    record.id, doc.next_id
                ));
            }
        }

        let draft = LinkDraft::new(
            record.name.as_str(),
            record.icon_url.as_str(),
            record.destination_url.as_str(),
        )
        .with_position(record.position);
        if let Err(e) = draft.validate() {
            result.errors.push(format!("Record {}: {}", record.id, e));
        }

        if record.modified_at < record.created_at {
            result.errors.push(format!(
                "Record {}: modifiedAt precedes createdAt",
                record.id
            ));
        }

        if result.errors.len() == before {
            result.valid_records += 1;
        }
    }

    result
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying buffer at {:?}", path);
    println!();

    let (doc, _) = match load_document(path) {
        Ok(loaded) => loaded,
        Err(e) => {
            println!("✗ Buffer could not be read: {e}");
            return Err("Verification failed".into());
        }
    };

    let result = verify_document(&doc);
    println!("Records checked: {}", result.records_checked);
    println!("Valid records:   {}", result.valid_records);
    for error in &result.errors {
        println!("  - {}", error);
    }

    println!();
    if result.is_ok() {
        println!("✓ Buffer verification passed");
        Ok(())
    } else {
        println!("✗ Buffer verification failed");
        Err("Verification failed".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use linksync_core::{LinkBuffer, LinkRecord};
    use std::fs;
    use tempfile::tempdir;

    fn record(id: &str, name: &str, position: i64) -> LinkRecord {
        let now = Utc::now();
        LinkRecord {
            id: id.into(),
            name: name.into(),
            icon_url: "https://x.com/i.ico".into(),
            destination_url: "https://x.com".into(),
            position,
            created_at: now,
            modified_at: now,
            active: true,
            pending: false,
        }
    }

    #[test]
    fn healthy_buffer_passes() {
        let buffer = LinkBuffer::in_memory();
        buffer
            .create(LinkDraft::new("A", "https://a.com/i.ico", "https://a.com"))
            .unwrap();
        let result = verify_document(&buffer.snapshot());
        assert!(result.is_ok());
        assert_eq!(result.valid_records, 1);
    }

    #[test]
    fn detects_problems() {
        let doc = BufferDocument {
            records: vec![
                record("1", "ok", 0),
                record("1", "dup", 1),
                record("5", "", 2),
                record("2", "neg", -3),
            ],
            next_id: 3,
            last_update: None,
        };

        let result = verify_document(&doc);
        assert_eq!(result.records_checked, 4);
        assert_eq!(result.valid_records, 1);
        assert!(result.errors.iter().any(|e| e.contains("Duplicate")));
        assert!(result.errors.iter().any(|e| e.contains("nextId")));
        assert!(result.errors.iter().any(|e| e.contains("name")));
        assert!(result.errors.iter().any(|e| e.contains("position")));
    }

    #[test]
    fn unparsable_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("links.json");
        fs::write(&path, b"{ nope").unwrap();
        assert!(run(&path).is_err());
    }
}
