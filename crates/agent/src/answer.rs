//! Grounded answer generation.
//!
//! # Flow
//!
//! 1. Select the most relevant chunks for the question
//! 2. Pack them into the context budget
//! 3. Wrap context and question in the grounding prompt
//! 4. Send one completion request and return the text verbatim
//!
//! No retries: a provider failure or timeout is returned to the caller.

use std::sync::Arc;
use std::time::Duration;
use kbchat_core::error::GenerationError;
use kbchat_core::provider::{Provider, ProviderRequest, Usage};
use kbchat_core::Chunk;
use tracing::{debug, info, warn};

use crate::context::packer::{self, PackedContext};
use crate::context::selector;

pub const SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant that answers questions based ONLY on the provided context.";

/// Returned without calling the model when nothing has been ingested.
pub const NO_DOCUMENTS_MESSAGE: &str =
    "No documents have been loaded into the knowledge base. Please add some files first.";

/// The user prompt for one question.
pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "You are a helpful assistant that answers questions based ONLY on the provided context.\n\
         If the answer cannot be determined from the context, say \"I don't have enough information to answer that.\"\n\
         Do not use any prior knowledge.\n\
         \n\
         CONTEXT:\n\
         {context}\n\
         \n\
         QUESTION: {query}\n\
         \n\
         ANSWER:"
    )
}

/// Model and budget settings for answering.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Chunks kept by the selector
    pub max_chunks: usize,
    /// Token budget for the packed context
    pub max_context_tokens: usize,
    /// Upper bound on the completion call
    pub timeout: Option<Duration>,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            model: "claude-3-5-sonnet-20240620".into(),
            temperature: 0.2,
            max_tokens: 500,
            max_chunks: selector::DEFAULT_LIMIT,
            max_context_tokens: packer::DEFAULT_MAX_TOKENS,
            timeout: None,
        }
    }
}

impl AnswerSettings {
    pub fn from_config(config: &kbchat_config::AppConfig) -> Self {
        let model = config
            .providers
            .get(&config.default_provider)
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| config.default_model.clone());

        Self {
            model,
            temperature: config.default_temperature,
            max_tokens: config.default_max_tokens,
            max_chunks: config.retrieval.max_chunks,
            max_context_tokens: config.retrieval.max_context_tokens,
            timeout: Some(Duration::from_secs(config.request_timeout_secs)),
        }
    }
}

/// An answer with the context that produced it.
#[derive(Debug, Clone)]
pub struct AnswerResult {
    pub answer: String,
    /// Chunks chosen by the selector, best first.
    pub selected: Vec<Chunk>,
    /// What the packer kept.
    pub packing: PackedContext,
    /// Model that responded; `None` when the model was not called.
    pub model: Option<String>,
    pub usage: Option<Usage>,
}

pub struct AnswerGenerator {
    provider: Arc<dyn Provider>,
    settings: AnswerSettings,
}

impl AnswerGenerator {
    pub fn new(provider: Arc<dyn Provider>, settings: AnswerSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &AnswerSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Answer `query` from `all_chunks`.
    pub async fn answer(&self, query: &str, all_chunks: &[Chunk]) -> Result<String, GenerationError> {
        Ok(self.answer_detailed(query, all_chunks).await?.answer)
    }

    pub async fn answer_detailed(
        &self,
        query: &str,
        all_chunks: &[Chunk],
    ) -> Result<AnswerResult, GenerationError> {
        if all_chunks.is_empty() {
            debug!("No chunks available, skipping completion");
            return Ok(AnswerResult {
                answer: NO_DOCUMENTS_MESSAGE.to_string(),
                selected: Vec::new(),
                packing: PackedContext::default(),
                model: None,
                usage: None,
            });
        }

        // ── Step 1: Select ──
        let selected = selector::select(all_chunks, query, self.settings.max_chunks);

        // ── Step 2: Pack ──
        let packing = packer::pack_with_stats(&selected, self.settings.max_context_tokens);
        debug!(
            candidates = all_chunks.len(),
            selected = selected.len(),
            included = packing.included,
            tokens = packing.tokens,
            "Context packed"
        );

        // ── Step 3: Generate ──
        let mut request = ProviderRequest::from_prompts(
            &self.settings.model,
            SYSTEM_INSTRUCTION,
            &build_prompt(&packing.text, query),
        );
        request.temperature = self.settings.temperature;
        request.max_tokens = Some(self.settings.max_tokens);

        let call = self.provider.complete(request);
        let response = match self.settings.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                warn!(timeout_secs = limit.as_secs(), "Completion timed out");
                GenerationError::Timeout {
                    timeout_secs: limit.as_secs(),
                }
            })?,
            None => call.await,
        }?;

        info!(
            model = %response.model,
            chunks = packing.included,
            answer_len = response.message.content.len(),
            "Answer generated"
        );

        Ok(AnswerResult {
            answer: response.message.content,
            selected,
            packing,
            model: Some(response.model),
            usage: response.usage,
        })
    }
}
