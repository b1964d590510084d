//! Context assembly: pick the chunks worth sending and fit them into the
//! prompt budget.
//!
//! | Stage | Input | Output |
//! |-------|-------|--------|
//! | Selector | every stored chunk + the question | top-`limit` chunks, best first |
//! | Packer | ranked chunks + token budget | one delimited context string |
//!
//! Both stages are pure functions and safe to call concurrently.

pub mod packer;
pub mod selector;
pub mod token;

pub use packer::{pack, pack_with_stats, PackedContext, CHUNK_DELIMITER};
pub use selector::{query_terms, rank, select, ScoredChunk};
pub use token::estimate_tokens;
