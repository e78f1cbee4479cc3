/// The Photo document model
///
/// A `Photo` is the unit handed to the persistence collaborator: one is
/// produced per completed capture session, and the editor mutates `url`
/// (never `original_url`) on save. Field names serialize in camelCase to
/// match the document-store schema.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Variant tag fixed at creation time
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PhotoKind {
    /// Multi-exposure capture merged by the capture pipeline
    Hdr,
    /// Single-frame capture
    Simple,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    /// Opaque unique identifier, assigned at capture time
    pub id: String,
    /// Current encoded image; replaced on every successful edit or save
    pub url: String,
    /// The unedited capture; set once, never mutated afterward
    pub original_url: String,
    /// Generated display name, derived from the capture timestamp
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PhotoKind,
    /// Capture instant in Unix milliseconds; refreshed on save
    pub timestamp: i64,
    /// Capture instant, immutable
    pub created_at: i64,
    /// Optional link to another photo's id (guided-tour chain, read-only here)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_to: Option<String>,
}

impl Photo {
    /// Create a fully-formed photo for a just-completed capture.
    ///
    /// Both `url` and `original_url` point at the final image, and both
    /// timestamps are set to the capture instant.
    pub fn new_capture(url: String, kind: PhotoKind) -> Self {
        let now = Utc::now().timestamp_millis();
        Photo {
            id: Uuid::new_v4().to_string(),
            original_url: url.clone(),
            url,
            name: format!("SNAP_{}.jpg", now),
            kind,
            timestamp: now,
            created_at: now,
            linked_to: None,
        }
    }

    /// Copy of this photo with a new current image and a refreshed
    /// timestamp. `original_url` and `created_at` are preserved.
    pub fn with_saved_url(&self, url: String) -> Self {
        Photo {
            url,
            timestamp: Utc::now().timestamp_millis(),
            ..self.clone()
        }
    }

    /// Serialize for the document store
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a photo document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
