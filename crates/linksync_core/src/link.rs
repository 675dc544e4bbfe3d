//! Link records and the input types that create or change them.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A link as held in the local buffer.
///
/// `pending` is local-only: it marks a change not yet confirmed by the remote
/// store and is stripped by [`LinkRecord::to_document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    /// Opaque identifier.
    pub id: String,
    /// Display label.
    pub name: String,
    /// Icon URL.
    pub icon_url: String,
    /// Target URL.
    pub destination_url: String,
    /// Sort key for manual ordering.
    pub position: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub modified_at: DateTime<Utc>,
    /// Soft-delete flag; `false` means logically deleted.
    pub active: bool,
    /// Unreconciled local change.
    #[serde(default)]
    pub pending: bool,
}

impl LinkRecord {
    /// Returns the remote representation of this record.
    pub fn to_document(&self) -> LinkDocument {
        LinkDocument {
            id: self.id.clone(),
            name: self.name.clone(),
            icon_url: self.icon_url.clone(),
            destination_url: self.destination_url.clone(),
            position: self.position,
            created_at: self.created_at,
            modified_at: self.modified_at,
            active: self.active,
        }
    }

    /// Builds a reconciled local record from a remote document.
    pub fn from_document(doc: LinkDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            icon_url: doc.icon_url,
            destination_url: doc.destination_url,
            position: doc.position,
            created_at: doc.created_at,
            modified_at: doc.modified_at,
            active: doc.active,
            pending: false,
        }
    }

    /// Marks the record as locally changed.
    pub(crate) fn touch(&mut self) {
        self.modified_at = next_timestamp(self.modified_at);
        self.pending = true;
    }
}

/// A link as stored remotely. Identical to [`LinkRecord`] minus `pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDocument {
    /// Document id. Empty on create requests that let the store pick one.
    #[serde(default)]
    pub id: String,
    /// Display label.
    pub name: String,
    /// Icon URL.
    pub icon_url: String,
    /// Target URL.
    pub destination_url: String,
    /// Sort key.
    #[serde(default)]
    pub position: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub modified_at: DateTime<Utc>,
    /// Soft-delete flag.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Input for creating a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDraft {
    /// Display label.
    #[serde(default)]
    pub name: String,
    /// Icon URL.
    #[serde(default)]
    pub icon_url: String,
    /// Target URL.
    #[serde(default)]
    pub destination_url: String,
    /// Explicit position; appended at the end when absent.
    #[serde(default)]
    pub position: Option<i64>,
}

impl LinkDraft {
    /// Creates a draft without an explicit position.
    pub fn new(
        name: impl Into<String>,
        icon_url: impl Into<String>,
        destination_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            icon_url: icon_url.into(),
            destination_url: destination_url.into(),
            position: None,
        }
    }

    /// Sets an explicit position.
    pub fn with_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }

    /// Validates every field and returns the normalized draft.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the first offending field.
    pub fn validate(&self) -> CoreResult<LinkDraft> {
        Ok(LinkDraft {
            name: validate_name(&self.name)?,
            icon_url: validate_url("iconUrl", &self.icon_url)?,
            destination_url: validate_url("destinationUrl", &self.destination_url)?,
            position: self.position.map(validate_position).transpose()?,
        })
    }
}

/// Partial update for a link. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPatch {
    /// New display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New icon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// New target URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_url: Option<String>,
    /// New position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl LinkPatch {
    /// Sets the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the icon URL.
    pub fn icon_url(mut self, url: impl Into<String>) -> Self {
        self.icon_url = Some(url.into());
        self
    }

    /// Sets the destination URL.
    pub fn destination_url(mut self, url: impl Into<String>) -> Self {
        self.destination_url = Some(url.into());
        self
    }

    /// Sets the position.
    pub fn position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }

    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.icon_url.is_none()
            && self.destination_url.is_none()
            && self.position.is_none()
    }

    /// Validates the provided fields and returns the normalized patch.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the first offending field.
    pub fn validate(&self) -> CoreResult<LinkPatch> {
        Ok(LinkPatch {
            name: self.name.as_deref().map(validate_name).transpose()?,
            icon_url: self
                .icon_url
                .as_deref()
                .map(|u| validate_url("iconUrl", u))
                .transpose()?,
            destination_url: self
                .destination_url
                .as_deref()
                .map(|u| validate_url("destinationUrl", u))
                .transpose()?,
            position: self.position.map(validate_position).transpose()?,
        })
    }

    /// Applies an already validated patch.
    pub(crate) fn apply_to(self, record: &mut LinkRecord) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(url) = self.icon_url {
            record.icon_url = url;
        }
        if let Some(url) = self.destination_url {
            record.destination_url = url;
        }
        if let Some(position) = self.position {
            record.position = position;
        }
    }
}

/// One entry of a reorder request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    /// Link id.
    pub id: String,
    /// New position.
    pub position: i64,
}

impl PositionUpdate {
    /// Creates a position update.
    pub fn new(id: impl Into<String>, position: i64) -> Self {
        Self {
            id: id.into(),
            position,
        }
    }
}

pub(crate) fn validate_name(name: &str) -> CoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("name", "must not be empty"));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn validate_url(field: &str, value: &str) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation(field, "must not be empty"));
    }
    Url::parse(trimmed)
        .map_err(|e| CoreError::validation(field, format!("not a valid URL ({e})")))?;
    Ok(trimmed.to_string())
}

pub(crate) fn validate_position(position: i64) -> CoreResult<i64> {
    if position < 0 {
        return Err(CoreError::validation(
            "position",
            format!("must be non-negative, got {position}"),
        ));
    }
    Ok(position)
}

/// Returns a timestamp strictly after `previous`, normally "now".
///
/// Flag clearing compares `modifiedAt` values, so two edits within the same
/// clock tick must still produce distinct timestamps.
pub(crate) fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + TimeDelta::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> LinkRecord {
        let now = Utc::now();
        LinkRecord {
            id: id.into(),
            name: "Docs".into(),
            icon_url: "https://docs.rs/favicon.ico".into(),
            destination_url: "https://docs.rs".into(),
            position: 3,
            created_at: now,
            modified_at: now,
            active: true,
            pending: true,
        }
    }

    #[test]
    fn draft_trims_fields() {
        let draft = LinkDraft::new("  Rust  ", " https://rust-lang.org/i.ico ", "https://rust-lang.org ");
        let valid = draft.validate().unwrap();
        assert_eq!(valid.name, "Rust");
        assert_eq!(valid.icon_url, "https://rust-lang.org/i.ico");
        assert_eq!(valid.destination_url, "https://rust-lang.org");
        assert_eq!(valid.position, None);
    }

    #[test]
    fn draft_rejects_blank_name() {
        let err = LinkDraft::new("   ", "https://x.com/i.ico", "https://x.com")
            .validate()
            .unwrap_err();
        match err {
            CoreError::Validation { field, .. } => assert_eq!(field, "name"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn draft_rejects_malformed_urls() {
        let err = LinkDraft::new("x", "not a url", "https://x.com")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("iconUrl"));

        let err = LinkDraft::new("x", "https://x.com/i.ico", "/relative/path")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("destinationUrl"));
    }

    #[test]
    fn draft_rejects_negative_position() {
        let err = LinkDraft::new("x", "https://x.com/i.ico", "https://x.com")
            .with_position(-1)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("position"));
    }

    #[test]
    fn patch_validates_only_present_fields() {
        assert!(LinkPatch::default().validate().unwrap().is_empty());

        let patch = LinkPatch::default().name("  New  ").validate().unwrap();
        assert_eq!(patch.name.as_deref(), Some("New"));
        assert!(patch.icon_url.is_none());

        assert!(LinkPatch::default().icon_url("nope").validate().is_err());
        assert!(LinkPatch::default().position(-5).validate().is_err());
    }

    #[test]
    fn document_strips_pending() {
        let rec = record("7");
        let doc = rec.to_document();
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("pending").is_none());
        assert_eq!(json["iconUrl"], "https://docs.rs/favicon.ico");

        let back = LinkRecord::from_document(doc);
        assert!(!back.pending);
        assert_eq!(back.id, "7");
    }

    #[test]
    fn record_json_uses_camel_case() {
        let json = serde_json::to_value(record("1")).unwrap();
        assert!(json.get("destinationUrl").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["pending"], true);
    }

    #[test]
    fn touch_always_advances_modified_at() {
        let mut rec = record("1");
        rec.modified_at = Utc::now() + TimeDelta::seconds(60);
        let before = rec.modified_at;
        rec.pending = false;

        rec.touch();
        assert!(rec.modified_at > before);
        assert!(rec.pending);
    }
}
