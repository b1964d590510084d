//! Shared test helpers: scripted providers and an in-process file source.

use kbchat_core::error::{ProviderError, SourceError};
use kbchat_core::message::Message;
use kbchat_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use kbchat_core::source::{FetchedFile, FileSource, RemoteFile};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request. Panics if more calls are made than responses
/// provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Content of the last user message sent.
    pub fn last_user_prompt(&self) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .and_then(|r| r.messages.last())
            .map(|m| m.content.clone())
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let call = requests.len();

        if call >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                call,
                responses.len()
            );
        }

        requests.push(request);
        Ok(responses[call].clone())
    }
}

/// Always fails with the given error.
pub struct FailingProvider(pub ProviderError);

#[async_trait::async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(self.0.clone())
    }
}

/// Answers only after `delay`.
pub struct SlowProvider(pub Duration);

#[async_trait::async_trait]
impl Provider for SlowProvider {
    fn name(&self) -> &str {
        "slow_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        tokio::time::sleep(self.0).await;
        Ok(make_text_response("too late"))
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A file source backed by in-memory contents, written to `dir` on fetch.
/// Ids without contents fail with `NotFound`.
pub struct MemorySource {
    dir: PathBuf,
    files: HashMap<String, (String, Vec<u8>)>,
    fetched: Mutex<Vec<PathBuf>>,
}

impl MemorySource {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            files: HashMap::new(),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn with_file(mut self, id: &str, name: &str, content: &[u8]) -> Self {
        self.files
            .insert(id.to_string(), (name.to_string(), content.to_vec()));
        self
    }

    pub fn fetched_paths(&self) -> Vec<PathBuf> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl FileSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(&self, _query: Option<&str>) -> Result<Vec<RemoteFile>, SourceError> {
        let mut files: Vec<RemoteFile> = self
            .files
            .iter()
            .map(|(id, (name, _))| RemoteFile {
                id: id.clone(),
                name: name.clone(),
                mime_type: String::new(),
            })
            .collect();
        files.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(files)
    }

    async fn fetch(&self, id: &str) -> Result<FetchedFile, SourceError> {
        let (name, content) = self
            .files
            .get(id)
            .ok_or_else(|| SourceError::NotFound(id.to_string()))?;

        let dir = self.dir.join(format!("kbchat-{id}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        self.fetched.lock().unwrap().push(path.clone());

        Ok(FetchedFile {
            id: id.to_string(),
            name: name.clone(),
            path,
        })
    }
}
