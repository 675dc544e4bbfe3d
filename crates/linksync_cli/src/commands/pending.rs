//! Pending command implementation.

use super::load_document;
use linksync_core::{BufferDocument, LinkRecord};
use std::path::Path;

/// Returns active pending records in position order.
pub fn pending_records(doc: &BufferDocument) -> Vec<LinkRecord> {
    let mut records: Vec<LinkRecord> = doc
        .records
        .iter()
        .filter(|r| r.active && r.pending)
        .cloned()
        .collect();
    records.sort_by_key(|r| r.position);
    records
}

/// Runs the pending command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (doc, _) = load_document(path)?;
    let records = pending_records(&doc);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            if records.is_empty() {
                println!("No pending records");
                return Ok(());
            }
            println!("{:<10} {:>8}  {:<25} {:<30}  NAME", "ID", "POSITION", "MODIFIED", "DESTINATION");
            for r in &records {
                println!(
                    "{:<10} {:>8}  {:<25} {:<30}  {}",
                    r.id,
                    r.position,
                    r.modified_at.format("%Y-%m-%d %H:%M:%S%.3f"),
                    r.destination_url,
                    r.name
                );
            }
            println!();
            println!("{} pending record(s)", records.len());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use linksync_core::{LinkBuffer, LinkDraft, PushedVersion};

    #[test]
    fn lists_only_pending_in_position_order() {
        let buffer = LinkBuffer::in_memory();
        let a = buffer
            .create(LinkDraft::new("A", "https://a.com/i.ico", "https://a.com").with_position(9))
            .unwrap();
        buffer
            .create(LinkDraft::new("B", "https://b.com/i.ico", "https://b.com").with_position(4))
            .unwrap();
        let c = buffer
            .create(LinkDraft::new("C", "https://c.com/i.ico", "https://c.com").with_position(1))
            .unwrap();
        buffer.clear_pending(&[PushedVersion::from(&c)]).unwrap();

        let records = pending_records(&buffer.snapshot());
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["B", "A"]);
        assert_eq!(records[1].id, a.id);
    }
}
