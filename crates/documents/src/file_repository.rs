//! File-backed document repository: the whole state as one JSON file.
//!
//! Layout: `{"files": {id: {"name", "chunks", "addedAt"}}, "lastUpdated"}`
//! with timestamps as integer milliseconds.
//!
//! State is loaded once on creation and rewritten in full on every mutation.
//! Each mutation holds the write lock across modify-and-persist and only
//! swaps the new state in after the file has been replaced, so a failed
//! write leaves both memory and disk at the previous state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kbchat_core::document::timestamp_now;
use kbchat_core::error::StorageError;
use kbchat_core::{Chunk, DocumentRecord, DocumentRepository, DocumentSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Everything the repository persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryState {
    #[serde(default)]
    pub files: BTreeMap<String, DocumentRecord>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
}

impl RepositoryState {
    pub fn empty() -> Self {
        Self {
            files: BTreeMap::new(),
            last_updated: timestamp_now(),
        }
    }
}

/// Result of reading the repository file at startup.
///
/// Loading never fails: anything short of a readable, well-formed file
/// falls back to an empty state, and the reason is kept.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(RepositoryState),
    Empty(String),
}

impl LoadOutcome {
    pub fn read(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Self::Empty(format!("no repository file at {}", path.display()));
            }
            Err(e) => return Self::Empty(format!("failed to read {}: {e}", path.display())),
        };

        match serde_json::from_str::<RepositoryState>(&content) {
            Ok(state) => Self::Loaded(state),
            Err(e) => Self::Empty(format!("failed to parse {}: {e}", path.display())),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn into_state(self) -> RepositoryState {
        match self {
            Self::Loaded(state) => state,
            Self::Empty(_) => RepositoryState::empty(),
        }
    }
}

pub struct FileRepository {
    path: PathBuf,
    state: Arc<RwLock<RepositoryState>>,
}

impl FileRepository {
    /// Open the repository at `path`, starting empty if the file is
    /// missing or unreadable.
    pub fn new(path: PathBuf) -> Self {
        let outcome = LoadOutcome::read(&path);
        match &outcome {
            LoadOutcome::Loaded(state) => {
                debug!(path = %path.display(), documents = state.files.len(), "Document repository loaded");
            }
            LoadOutcome::Empty(reason) if path.exists() => {
                warn!(path = %path.display(), reason = %reason, "Document repository unreadable, starting empty");
            }
            LoadOutcome::Empty(reason) => {
                debug!(reason = %reason, "Starting with an empty document repository");
            }
        }
        Self::with_state(path, outcome.into_state())
    }

    pub fn with_state(path: PathBuf, state: RepositoryState) -> Self {
        Self {
            path,
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the in-memory state.
    pub async fn snapshot(&self) -> RepositoryState {
        self.state.read().await.clone()
    }

    /// Write `state` to a sibling temp file, then rename it over the target.
    fn persist(&self, state: &RepositoryState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::CreateDir {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let content =
            serde_json::to_string(state).map_err(|e| StorageError::Serialize(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let write_err = |e: std::io::Error| StorageError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        };
        std::fs::write(&tmp, content).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            write_err(e)
        })?;

        Ok(())
    }

    /// Apply `change` to a copy of the state, persist it, then commit.
    ///
    /// The write lock is held from the clone until the commit. A change
    /// returning `None` made no modification: nothing is written and
    /// `last_updated` stays put.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut RepositoryState) -> Option<T>,
    ) -> Result<Option<T>, StorageError> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let Some(out) = change(&mut next) else {
            return Ok(None);
        };
        next.last_updated = timestamp_now();
        self.persist(&next)?;
        *guard = next;
        Ok(Some(out))
    }
}

#[async_trait]
impl DocumentRepository for FileRepository {
    fn name(&self) -> &str {
        "file"
    }

    async fn add(&self, id: &str, name: &str, chunks: Vec<Chunk>) -> Result<(), StorageError> {
        let count = chunks.len();
        self.mutate(|state| {
            state
                .files
                .insert(id.to_string(), DocumentRecord::new(name, chunks));
            Some(())
        })
        .await?;
        info!(id, name, chunks = count, "Document stored");
        Ok(())
    }

    async fn get_chunks(&self, id: &str) -> Vec<Chunk> {
        self.state
            .read()
            .await
            .files
            .get(id)
            .map(|r| r.chunks.clone())
            .unwrap_or_default()
    }

    async fn all_chunks(&self) -> Vec<Chunk> {
        self.state
            .read()
            .await
            .files
            .values()
            .flat_map(|r| r.chunks.iter().cloned())
            .collect()
    }

    async fn remove(&self, id: &str) -> Result<bool, StorageError> {
        let removed = self
            .mutate(|state| state.files.remove(id).map(|_| ()))
            .await?
            .is_some();
        debug!(id, removed, "Document removed");
        Ok(removed)
    }

    async fn list(&self) -> Vec<DocumentSummary> {
        self.state
            .read()
            .await
            .files
            .iter()
            .map(|(id, record)| DocumentSummary::from_record(id, record))
            .collect()
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.mutate(|state| {
            state.files.clear();
            Some(())
        })
        .await?;
        info!("Document repository cleared");
        Ok(())
    }

    async fn last_updated(&self) -> DateTime<Utc> {
        self.state.read().await.last_updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn chunks(items: &[&str]) -> Vec<Chunk> {
        items.iter().map(|s| Chunk::from(*s)).collect()
    }

    fn repo_in(dir: &TempDir) -> FileRepository {
        FileRepository::new(dir.path().join("document_storage.json"))
    }

    #[tokio::test]
    async fn add_then_get_chunks() {
        let dir = TempDir::new().unwrap();
        let repo = repo_in(&dir);
        repo.add("doc1", "Sky", chunks(&["The sky is blue.", "Grass is green."]))
            .await
            .unwrap();
        assert_eq!(
            repo.get_chunks("doc1").await,
            chunks(&["The sky is blue.", "Grass is green."])
        );
    }

    #[tokio::test]
    async fn unknown_id_has_no_chunks() {
        let dir = TempDir::new().unwrap();
        let repo = repo_in(&dir);
        assert!(repo.get_chunks("missing").await.is_empty());
    }

    #[tokio::test]
    async fn re_adding_replaces_whole_record() {
        let dir = TempDir::new().unwrap();
        let repo = repo_in(&dir);
        repo.add("doc1", "v1", chunks(&["a", "b", "c"])).await.unwrap();
        repo.add("doc1", "v2", chunks(&["d"])).await.unwrap();

        assert_eq!(repo.get_chunks("doc1").await, chunks(&["d"]));
        let list = repo.list().await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "v2");
        assert_eq!(list[0].chunk_count, 1);
    }

    #[tokio::test]
    async fn remove_reports_existence() {
        let dir = TempDir::new().unwrap();
        let repo = repo_in(&dir);
        repo.add("doc1", "One", chunks(&["x"])).await.unwrap();

        assert!(repo.remove("doc1").await.unwrap());
        assert!(repo.get_chunks("doc1").await.is_empty());
        assert!(!repo.remove("doc1").await.unwrap());
    }

    #[tokio::test]
    async fn clear_empties_list() {
        let dir = TempDir::new().unwrap();
        let repo = repo_in(&dir);
        repo.add("a", "A", chunks(&["1"])).await.unwrap();
        repo.add("b", "B", chunks(&["2"])).await.unwrap();
        repo.clear().await.unwrap();
        assert!(repo.list().await.is_empty());
        assert!(repo.all_chunks().await.is_empty());
    }

    #[tokio::test]
    async fn all_chunks_keeps_per_document_order() {
        let dir = TempDir::new().unwrap();
        let repo = repo_in(&dir);
        repo.add("a", "A", chunks(&["a1", "a2", "a3"])).await.unwrap();
        repo.add("b", "B", chunks(&["b1", "b2"])).await.unwrap();

        let all: Vec<String> = repo.all_chunks().await.into_iter().map(Chunk::into_inner).collect();
        assert_eq!(all.len(), 5);
        let a: Vec<&String> = all.iter().filter(|c| c.starts_with('a')).collect();
        let b: Vec<&String> = all.iter().filter(|c| c.starts_with('b')).collect();
        assert_eq!(a, ["a1", "a2", "a3"]);
        assert_eq!(b, ["b1", "b2"]);
    }

    #[tokio::test]
    async fn mutations_persist_across_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("document_storage.json");

        let repo = FileRepository::new(path.clone());
        repo.add("doc1", "One", chunks(&["first chunk"])).await.unwrap();
        repo.add("doc2", "Two", chunks(&["second chunk"])).await.unwrap();
        repo.remove("doc1").await.unwrap();
        let before = repo.snapshot().await;

        let reloaded = FileRepository::new(path);
        assert_eq!(reloaded.snapshot().await, before);
        assert_eq!(reloaded.get_chunks("doc2").await, chunks(&["second chunk"]));
    }

    #[tokio::test]
    async fn persisted_layout_uses_camel_case() {
        let dir = TempDir::new().unwrap();
        let repo = repo_in(&dir);
        repo.add("doc1", "One", chunks(&["text"])).await.unwrap();

        let raw = std::fs::read_to_string(repo.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["lastUpdated"].is_i64());
        assert_eq!(value["files"]["doc1"]["name"], "One");
        assert_eq!(value["files"]["doc1"]["chunks"][0], "text");
        assert!(value["files"]["doc1"]["addedAt"].is_i64());
    }

    #[tokio::test]
    async fn mutations_advance_last_updated() {
        let dir = TempDir::new().unwrap();
        let repo = repo_in(&dir);
        let start = repo.last_updated().await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        repo.add("doc1", "One", chunks(&["x"])).await.unwrap();
        assert!(repo.last_updated().await > start);
    }

    #[test]
    fn missing_file_loads_empty() {
        let outcome = LoadOutcome::read(Path::new("/nonexistent/kbchat/document_storage.json"));
        assert!(!outcome.is_loaded());
        assert!(outcome.into_state().files.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "{{ this is not json").unwrap();

        let outcome = LoadOutcome::read(tmp.path());
        match &outcome {
            LoadOutcome::Empty(reason) => assert!(reason.contains("parse")),
            LoadOutcome::Loaded(_) => panic!("corrupt file must not load"),
        }

        let repo = FileRepository::new(tmp.path().to_path_buf());
        assert!(repo.list().await.is_empty());
    }

    #[tokio::test]
    async fn failed_write_is_not_committed() {
        // The parent "directory" is a regular file, so persisting must fail.
        let blocker = NamedTempFile::new().unwrap();
        let repo = FileRepository::new(blocker.path().join("document_storage.json"));

        let err = repo.add("doc1", "One", chunks(&["x"])).await.unwrap_err();
        assert!(matches!(err, StorageError::CreateDir { .. }));
        assert!(repo.list().await.is_empty());
        assert!(repo.get_chunks("doc1").await.is_empty());
    }

    #[tokio::test]
    async fn removing_absent_id_writes_nothing() {
        // Any write would fail: the parent "directory" is a regular file.
        let blocker = NamedTempFile::new().unwrap();
        let mut state = RepositoryState::empty();
        state
            .files
            .insert("doc1".into(), DocumentRecord::new("One", chunks(&["x"])));
        let repo = FileRepository::with_state(blocker.path().join("docs.json"), state);
        let before = repo.last_updated().await;

        assert!(!repo.remove("missing").await.unwrap());
        assert_eq!(repo.last_updated().await, before);
        assert_eq!(repo.list().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_removes_of_one_id() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(repo_in(&dir));
        repo.add("doc1", "One", chunks(&["x"])).await.unwrap();
        repo.add("doc2", "Two", chunks(&["y"])).await.unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move { repo.remove("doc1").await })
            })
            .collect();
        let mut removed = 0;
        for h in handles {
            if h.await.unwrap().unwrap() {
                removed += 1;
            }
        }
        assert_eq!(removed, 1);

        let reloaded = FileRepository::new(repo.path().to_path_buf());
        assert_eq!(reloaded.snapshot().await, repo.snapshot().await);
        assert_eq!(reloaded.list().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_adds_all_land() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(repo_in(&dir));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    repo.add(&format!("doc{i}"), "Doc", chunks(&["body"])).await
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let reloaded = FileRepository::new(repo.path().to_path_buf());
        assert_eq!(reloaded.list().await.len(), 8);
    }
}
