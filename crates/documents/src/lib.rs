//! Document handling for kbchat: raw text in, persisted chunks out.

pub mod chunker;
pub mod extract;
pub mod file_repository;

pub use chunker::{chunk, Chunker};
pub use extract::{extract, process_document, FileKind};
pub use file_repository::{FileRepository, LoadOutcome, RepositoryState};
