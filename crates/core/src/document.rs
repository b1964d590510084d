//! Document repository trait: durable storage of chunked documents.
//!
//! A document is stored as its ordered list of chunks, keyed by the stable
//! identifier the file source gave it. The repository is the only state
//! that outlives a single question.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use crate::error::StorageError;

/// An immutable slice of extracted document text.
///
/// Chunks carry no identity beyond their position in a document's chunk
/// list and are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chunk(String);

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Deref for Chunk {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Chunk {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Chunk {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Chunk {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for Chunk {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Chunk {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Current time truncated to millisecond precision.
///
/// Persisted timestamps are integer milliseconds, so truncating at creation
/// keeps a saved-then-loaded state identical to the original.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// A stored document: display name, ordered chunks and ingestion time.
///
/// The identifier is the key under which the record is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Display name (not guaranteed unique)
    pub name: String,

    /// Chunks in original document order
    #[serde(default)]
    pub chunks: Vec<Chunk>,

    /// When the document was ingested
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub added_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn new(name: impl Into<String>, chunks: Vec<Chunk>) -> Self {
        Self {
            name: name.into(),
            chunks,
            added_at: timestamp_now(),
        }
    }
}

/// Metadata projection of a stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub added_at: DateTime<Utc>,
    pub chunk_count: usize,
}

impl DocumentSummary {
    pub fn from_record(id: &str, record: &DocumentRecord) -> Self {
        Self {
            id: id.to_string(),
            name: record.name.clone(),
            added_at: record.added_at,
            chunk_count: record.chunks.len(),
        }
    }
}

/// The core DocumentRepository trait.
///
/// Every mutating call persists the full state before returning; a failed
/// write leaves the previous state in place and surfaces as `StorageError`.
/// Reads never fail.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// The backend name (e.g., "file").
    fn name(&self) -> &str;

    /// Insert or fully replace the record for `id`.
    async fn add(&self, id: &str, name: &str, chunks: Vec<Chunk>) -> std::result::Result<(), StorageError>;

    /// Chunks of one document, empty if `id` is unknown.
    async fn get_chunks(&self, id: &str) -> Vec<Chunk>;

    /// Every stored chunk. Order within a document is preserved; order
    /// across documents is unspecified.
    async fn all_chunks(&self) -> Vec<Chunk>;

    /// Delete a record. Returns `false` if it did not exist.
    async fn remove(&self, id: &str) -> std::result::Result<bool, StorageError>;

    /// One summary per stored document.
    async fn list(&self) -> Vec<DocumentSummary>;

    /// Reset to the empty state.
    async fn clear(&self) -> std::result::Result<(), StorageError>;

    /// Time of the most recent mutation.
    async fn last_updated(&self) -> DateTime<Utc>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_compares_with_str() {
        let chunk = Chunk::from("apple pie");
        assert_eq!(chunk, "apple pie");
        assert_eq!(chunk.as_str(), "apple pie");
        assert!(chunk.contains("pie"));
    }

    #[test]
    fn chunk_length_counts_characters() {
        let chunk = Chunk::from("héllo");
        assert_eq!(chunk.char_len(), 5);
        assert_eq!(chunk.len(), 6);
    }

    #[test]
    fn chunk_serializes_as_plain_string() {
        let json = serde_json::to_string(&vec![Chunk::from("a"), Chunk::from("b")]).unwrap();
        assert_eq!(json, r#"["a","b"]"#);
    }

    #[test]
    fn record_uses_camel_case_millis() {
        let record = DocumentRecord::new("report.pdf", vec![Chunk::from("text")]);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "report.pdf");
        assert!(json["addedAt"].is_i64());
        let back: DocumentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn summary_counts_chunks() {
        let record = DocumentRecord::new("a.csv", vec![Chunk::from("x"), Chunk::from("y")]);
        let summary = DocumentSummary::from_record("id-1", &record);
        assert_eq!(summary.id, "id-1");
        assert_eq!(summary.chunk_count, 2);
        assert_eq!(summary.added_at, record.added_at);
    }
}
