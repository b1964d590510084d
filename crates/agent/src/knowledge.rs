//! The knowledge agent: repository + chunker + answer generator behind one
//! handle, which is what the presentation shell drives.

use std::path::Path;
use std::sync::Arc;
use kbchat_core::error::{GenerationError, StorageError};
use kbchat_core::{Chunk, DocumentRepository, DocumentSummary};
use kbchat_documents::{process_document, Chunker};
use tracing::info;

use crate::answer::{AnswerGenerator, AnswerResult};

/// Returned for a blank question without touching the repository.
pub const EMPTY_QUESTION_MESSAGE: &str = "Please enter a question.";

pub struct KnowledgeAgent {
    repository: Arc<dyn DocumentRepository>,
    generator: AnswerGenerator,
    chunker: Chunker,
}

impl KnowledgeAgent {
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        generator: AnswerGenerator,
        chunker: Chunker,
    ) -> Self {
        Self {
            repository,
            generator,
            chunker,
        }
    }

    pub fn repository(&self) -> &Arc<dyn DocumentRepository> {
        &self.repository
    }

    pub fn generator(&self) -> &AnswerGenerator {
        &self.generator
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Store already-chunked text under `id`, replacing any previous record.
    pub async fn ingest(&self, id: &str, name: &str, chunks: Vec<Chunk>) -> Result<(), StorageError> {
        self.repository.add(id, name, chunks).await
    }

    /// Chunk raw text and store it. Returns the number of chunks stored.
    pub async fn ingest_text(&self, id: &str, name: &str, text: &str) -> Result<usize, StorageError> {
        let chunks = self.chunker.chunk(text);
        let count = chunks.len();
        self.repository.add(id, name, chunks).await?;
        Ok(count)
    }

    /// Extract, chunk and store a local file.
    pub async fn ingest_file(&self, id: &str, name: &str, path: &Path) -> kbchat_core::Result<usize> {
        let chunks = process_document(path, &self.chunker)?;
        let count = chunks.len();
        self.repository.add(id, name, chunks).await?;
        info!(id, name, chunks = count, "File ingested");
        Ok(count)
    }

    /// Answer a question from everything ingested so far.
    pub async fn query(&self, question: &str) -> Result<String, GenerationError> {
        Ok(self.query_detailed(question).await?.answer)
    }

    pub async fn query_detailed(&self, question: &str) -> Result<AnswerResult, GenerationError> {
        if question.trim().is_empty() {
            return Ok(AnswerResult {
                answer: EMPTY_QUESTION_MESSAGE.to_string(),
                selected: Vec::new(),
                packing: Default::default(),
                model: None,
                usage: None,
            });
        }

        let all_chunks = self.repository.all_chunks().await;
        self.generator.answer_detailed(question, &all_chunks).await
    }

    pub async fn list_documents(&self) -> Vec<DocumentSummary> {
        self.repository.list().await
    }

    pub async fn document_count(&self) -> usize {
        self.repository.list().await.len()
    }

    pub async fn remove_document(&self, id: &str) -> Result<bool, StorageError> {
        self.repository.remove(id).await
    }

    pub async fn clear_all(&self) -> Result<(), StorageError> {
        self.repository.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::{AnswerSettings, NO_DOCUMENTS_MESSAGE};
    use crate::test_helpers::*;
    use kbchat_documents::FileRepository;
    use tempfile::TempDir;

    fn agent_with(provider: Arc<SequentialMockProvider>, dir: &TempDir) -> KnowledgeAgent {
        let repo = Arc::new(FileRepository::new(dir.path().join("docs.json")));
        KnowledgeAgent::new(
            repo,
            AnswerGenerator::new(provider, AnswerSettings::default()),
            Chunker::default(),
        )
    }

    #[tokio::test]
    async fn ingest_then_query() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(SequentialMockProvider::single_text("Blue."));
        let agent = agent_with(provider.clone(), &dir);

        agent
            .ingest(
                "doc1",
                "colors.txt",
                vec![Chunk::from("The sky is blue."), Chunk::from("Grass is green.")],
            )
            .await
            .unwrap();

        assert_eq!(agent.query("what color is the sky").await.unwrap(), "Blue.");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_repository_does_not_call_model() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let agent = agent_with(provider.clone(), &dir);

        assert_eq!(agent.query("anything").await.unwrap(), NO_DOCUMENTS_MESSAGE);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let agent = agent_with(provider.clone(), &dir);
        agent.ingest("d", "D", vec![Chunk::from("text")]).await.unwrap();

        assert_eq!(agent.query("   ").await.unwrap(), EMPTY_QUESTION_MESSAGE);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn ingest_text_chunks_before_storing() {
        let dir = TempDir::new().unwrap();
        let agent = agent_with(Arc::new(SequentialMockProvider::new(vec![])), &dir);

        let text = "x".repeat(1850);
        let count = agent.ingest_text("long", "long.txt", &text).await.unwrap();
        // windows start at 0, 900 and 1800; the last holds 50 chars
        assert_eq!(count, 3);
        assert_eq!(agent.repository().get_chunks("long").await.len(), 3);
    }

    #[tokio::test]
    async fn ingest_file_reads_local_text() {
        let dir = TempDir::new().unwrap();
        let agent = agent_with(Arc::new(SequentialMockProvider::new(vec![])), &dir);

        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Meeting notes: the launch moves to March. ".repeat(3)).unwrap();
        let count = agent.ingest_file("notes", "notes.txt", &path).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(agent.document_count().await, 1);
    }

    #[tokio::test]
    async fn ingest_file_surfaces_extraction_errors() {
        let dir = TempDir::new().unwrap();
        let agent = agent_with(Arc::new(SequentialMockProvider::new(vec![])), &dir);

        let err = agent
            .ingest_file("x", "x.txt", &dir.path().join("missing.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, kbchat_core::Error::Extraction(_)));
        assert_eq!(agent.document_count().await, 0);
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let dir = TempDir::new().unwrap();
        let agent = agent_with(Arc::new(SequentialMockProvider::new(vec![])), &dir);
        agent.ingest("a", "A", vec![Chunk::from("1")]).await.unwrap();
        agent.ingest("b", "B", vec![Chunk::from("2")]).await.unwrap();

        assert!(agent.remove_document("a").await.unwrap());
        assert!(!agent.remove_document("a").await.unwrap());
        assert_eq!(agent.list_documents().await.len(), 1);

        agent.clear_all().await.unwrap();
        assert!(agent.list_documents().await.is_empty());
    }
}
