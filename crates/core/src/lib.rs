//! # kbchat Core
//!
//! Domain types, traits, and error definitions for the kbchat document
//! question-answering agent. This crate has **zero framework dependencies**:
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here. Implementations
//! live in their respective crates:
//! - `DocumentRepository` → `kbchat-documents`
//! - `Provider` → `kbchat-providers`
//! - `FileSource` → `kbchat-drive`

pub mod error;
pub mod message;
pub mod provider;
pub mod document;
pub mod source;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use document::{Chunk, DocumentRecord, DocumentRepository, DocumentSummary};
pub use source::{FetchedFile, FileSource, RemoteFile};
