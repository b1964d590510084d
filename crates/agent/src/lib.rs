//! The question-answering agent for kbchat.
//!
//! A question goes through a fixed pipeline:
//!
//! 1. **Collect** every stored chunk from the repository
//! 2. **Select** the most relevant ones by keyword overlap
//! 3. **Pack** them into the context token budget
//! 4. **Generate** one grounded completion and return it verbatim
//!
//! Ingestion runs the other way: fetch, extract, chunk, store.

pub mod answer;
pub mod context;
pub mod ingest;
pub mod knowledge;

#[cfg(test)]
mod test_helpers;

pub use answer::{AnswerGenerator, AnswerResult, AnswerSettings, NO_DOCUMENTS_MESSAGE};
pub use context::{pack, select, PackedContext};
pub use ingest::{IngestFailure, IngestReport, IngestedFile};
pub use knowledge::{KnowledgeAgent, EMPTY_QUESTION_MESSAGE};
