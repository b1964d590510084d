//! File source trait: where documents come from.
//!
//! A source lists remote files and downloads one at a time to a local path.
//! The Google Drive implementation lives in `kbchat-drive`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::error::SourceError;

/// A remote file as reported by `FileSource::list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
}

/// A file downloaded to local disk, ready for extraction.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    /// Remote identifier
    pub id: String,
    /// Remote display name
    pub name: String,
    /// Local path of the downloaded copy
    pub path: PathBuf,
}

#[async_trait]
pub trait FileSource: Send + Sync {
    /// The source name (e.g., "google_drive").
    fn name(&self) -> &str;

    /// List files, optionally filtered by a source-specific query.
    async fn list(&self, query: Option<&str>) -> std::result::Result<Vec<RemoteFile>, SourceError>;

    /// Download a file and return where it landed.
    async fn fetch(&self, id: &str) -> std::result::Result<FetchedFile, SourceError>;
}
