//! Batch ingestion from a file source or the local filesystem.
//!
//! Each file is fetched, extracted, chunked and stored on its own. A file
//! that fails at any step is recorded in the report and the batch moves on.

use std::path::{Path, PathBuf};
use kbchat_core::error::ExtractionError;
use kbchat_core::FileSource;
use tracing::{debug, info, warn};

use crate::knowledge::KnowledgeAgent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedFile {
    pub id: String,
    pub name: String,
    pub chunks: usize,
}

#[derive(Debug)]
pub struct IngestFailure {
    pub id: String,
    pub error: kbchat_core::Error,
}

/// Outcome of one ingestion batch.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub succeeded: Vec<IngestedFile>,
    pub failed: Vec<IngestFailure>,
    /// Documents in the repository after the batch.
    pub total_documents: usize,
}

impl IngestReport {
    pub fn summary(&self) -> String {
        format!(
            "Successfully processed {} files. Total documents in repository: {}",
            self.succeeded.len(),
            self.total_documents
        )
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl KnowledgeAgent {
    /// Fetch and ingest each id from `source`.
    ///
    /// Downloaded copies are deleted once processed, whether or not the
    /// file made it into the repository.
    pub async fn ingest_from_source(&self, source: &dyn FileSource, ids: &[String]) -> IngestReport {
        let mut report = IngestReport::default();

        for id in ids {
            let fetched = match source.fetch(id).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!(source = source.name(), id = %id, error = %e, "Fetch failed");
                    report.failed.push(IngestFailure {
                        id: id.clone(),
                        error: e.into(),
                    });
                    continue;
                }
            };

            let result = self.ingest_file(id, &fetched.name, &fetched.path).await;
            remove_download(&fetched.path);

            match result {
                Ok(chunks) => report.succeeded.push(IngestedFile {
                    id: id.clone(),
                    name: fetched.name,
                    chunks,
                }),
                Err(error) => {
                    warn!(id = %id, name = %fetched.name, error = %error, "Ingest failed");
                    report.failed.push(IngestFailure {
                        id: id.clone(),
                        error,
                    });
                }
            }
        }

        report.total_documents = self.document_count().await;
        info!(
            source = source.name(),
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            total = report.total_documents,
            "Ingestion batch finished"
        );
        report
    }

    /// Ingest local files. The canonical path is the document id, so adding
    /// the same file twice replaces it.
    pub async fn ingest_local(&self, paths: &[PathBuf]) -> IngestReport {
        let mut report = IngestReport::default();

        for path in paths {
            let canonical = match path.canonicalize() {
                Ok(p) => p,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot resolve path");
                    report.failed.push(IngestFailure {
                        id: path.display().to_string(),
                        error: ExtractionError::Read {
                            path: path.clone(),
                            reason: e.to_string(),
                        }
                        .into(),
                    });
                    continue;
                }
            };

            let id = canonical.display().to_string();
            let name = canonical
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| id.clone());

            match self.ingest_file(&id, &name, &canonical).await {
                Ok(chunks) => report.succeeded.push(IngestedFile { id, name, chunks }),
                Err(error) => {
                    warn!(id = %id, error = %error, "Ingest failed");
                    report.failed.push(IngestFailure { id, error });
                }
            }
        }

        report.total_documents = self.document_count().await;
        report
    }
}

/// Delete a downloaded file and its directory if that leaves it empty.
fn remove_download(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        debug!(path = %path.display(), error = %e, "Could not remove download");
        return;
    }
    if let Some(parent) = path.parent() {
        // fails harmlessly when the directory still has entries
        let _ = std::fs::remove_dir(parent);
    }
}
