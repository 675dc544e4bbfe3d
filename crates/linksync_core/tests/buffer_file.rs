//! File-backed buffer behaviour: persistence, failure isolation and ordering.

use linksync_core::{BufferDocument, CoreError, LinkBuffer, LinkDraft, LinkPatch, PositionUpdate};
use linksync_storage::FileBackend;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn open(path: &Path) -> LinkBuffer {
    LinkBuffer::open(Box::new(FileBackend::open(path).unwrap()))
}

fn draft(name: &str) -> LinkDraft {
    LinkDraft::new(
        name,
        format!("https://{name}.example.com/favicon.ico"),
        format!("https://{name}.example.com/"),
    )
}

#[test]
fn create_then_get_returns_pending_record() {
    let dir = tempdir().unwrap();
    let buffer = open(&dir.path().join("links.json"));

    let created = buffer
        .create(LinkDraft::new(
            "  Rust Blog ",
            "https://blog.rust-lang.org/favicon.ico",
            " https://blog.rust-lang.org ",
        ))
        .unwrap();
    let fetched = buffer.get(&created.id).unwrap();

    assert_eq!(fetched, created);
    assert!(fetched.pending);
    assert!(fetched.active);
    assert_eq!(fetched.name, "Rust Blog");
    assert_eq!(fetched.destination_url, "https://blog.rust-lang.org");
}

#[test]
fn buffer_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("links.json");

    let id = {
        let buffer = open(&path);
        buffer.create(draft("a")).unwrap();
        buffer.create(draft("b")).unwrap().id
    };

    let reopened = open(&path);
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.get(&id).unwrap().name, "b");
    assert_eq!(reopened.create(draft("c")).unwrap().id, "3");
}

#[test]
fn file_layout_matches_document_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("links.json");
    let buffer = open(&path);
    buffer.create(draft("a")).unwrap();

    let value: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert!(value["records"].is_array());
    assert_eq!(value["nextId"], 2);
    assert!(value["lastUpdate"].is_string());
    assert_eq!(value["records"][0]["pending"], true);
    assert_eq!(value["records"][0]["iconUrl"], "https://a.example.com/favicon.ico");
}

#[test]
fn update_of_missing_id_leaves_file_identical() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("links.json");
    let buffer = open(&path);
    buffer.create(draft("a")).unwrap();
    let before = fs::read(&path).unwrap();

    let err = buffer
        .update("404", LinkPatch::default().name("ghost"))
        .unwrap_err();

    assert!(matches!(err, CoreError::NotFound { ref id } if id == "404"));
    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(buffer.len(), 1);
}

#[test]
fn empty_name_is_rejected_and_nothing_persisted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("links.json");
    let buffer = open(&path);

    let err = buffer
        .create(LinkDraft::new("", "https://x.com/i.ico", "https://x.com"))
        .unwrap_err();

    assert!(err.is_validation());
    assert!(err.to_string().contains("name"));
    assert!(!path.exists());
    assert!(buffer.is_empty());
}

#[test]
fn reorder_scenario_sorts_by_position() {
    let dir = tempdir().unwrap();
    let buffer = open(&dir.path().join("links.json"));

    let a = buffer.create(draft("a").with_position(0)).unwrap();
    let b = buffer.create(draft("b").with_position(1)).unwrap();
    let c = buffer.create(draft("c").with_position(2)).unwrap();

    buffer
        .reorder(&[
            PositionUpdate::new(b.id.clone(), 5),
            PositionUpdate::new(a.id.clone(), 6),
        ])
        .unwrap();

    let order: Vec<(String, i64)> = buffer
        .load_all()
        .into_iter()
        .map(|r| (r.id, r.position))
        .collect();
    assert_eq!(order, vec![(c.id, 2), (b.id, 5), (a.id, 6)]);
}

#[test]
fn corrupt_file_loads_empty_and_is_overwritten() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("links.json");
    fs::write(&path, b"{\"records\": [ {\"id\": ").unwrap();

    let buffer = open(&path);
    assert!(buffer.load_all().is_empty());

    buffer.create(draft("fresh")).unwrap();
    let doc = BufferDocument::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(doc.records.len(), 1);
    assert_eq!(doc.records[0].id, "1");
}

#[test]
fn legacy_document_without_pending_flags_loads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("links.json");
    fs::write(
        &path,
        r#"{
            "records": [{
                "id": "3",
                "name": "Old",
                "iconUrl": "https://old.example.com/i.ico",
                "destinationUrl": "https://old.example.com",
                "position": 0,
                "createdAt": "2024-01-01T00:00:00Z",
                "modifiedAt": "2024-01-01T00:00:00Z",
                "active": true
            }],
            "nextId": 4
        }"#,
    )
    .unwrap();

    let buffer = open(&path);
    let record = buffer.get("3").unwrap();
    assert!(!record.pending);
    assert!(buffer.last_update().is_none());
}
