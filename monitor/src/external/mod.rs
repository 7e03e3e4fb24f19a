//! Third-party collaborators: a screenshot renderer and a reference manager.
//!
//! The pipeline only sees the traits; the HTTP clients are built from
//! configuration when credentials are present.

#[cfg(test)]
pub(crate) mod local_server;
mod reference;
mod screenshot;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExternalError;

pub use reference::HttpReferenceManager;
pub use screenshot::HttpScreenshotter;

/// Renders a URL to an image.
pub trait Screenshotter {
    /// Returns PNG bytes.
    fn capture(&self, url: &str) -> Result<Vec<u8>, ExternalError>;
}

/// A bibliographic collection that can hold monitored pages.
pub trait ReferenceManager {
    /// Every record of the configured collection.
    fn list_records(&self) -> Result<Vec<RemoteRecord>, ExternalError>;

    fn create_record(&self, draft: &RecordDraft) -> Result<RecordRef, ExternalError>;

    fn attach_file(&self, record: &RecordRef, path: &Path) -> Result<(), ExternalError>;
}

/// What a remote record stands for. Archive records are captures of a
/// changed page and never become targets on pull.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    #[default]
    Target,
    Archive,
}

/// A record as stored by the reference manager. `title` holds the company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub key: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub kind: RecordKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub title: String,
    pub url: String,
    pub note: String,
    pub role: String,
    pub kind: RecordKind,
}

/// Handle to a created record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub key: String,
    pub link: String,
}
