//! Keyword relevance selection.
//!
//! The query is lower-cased and split on whitespace into a set of distinct
//! terms. A chunk scores one point per term that occurs anywhere in its
//! lower-cased text. This is raw substring containment: "cat" matches
//! "category". Ranking is a stable sort on score, so equal scores keep
//! their input order, and nothing is filtered out for scoring zero.

use kbchat_core::Chunk;
use std::collections::HashSet;

pub const DEFAULT_LIMIT: usize = 5;

/// A chunk with its relevance score and original position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: usize,
    pub position: usize,
}

/// Distinct lower-cased whitespace-separated terms.
pub fn query_terms(query: &str) -> HashSet<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn score(chunk: &Chunk, terms: &HashSet<String>) -> usize {
    let haystack = chunk.to_lowercase();
    terms.iter().filter(|t| haystack.contains(t.as_str())).count()
}

/// Every chunk, best first, ties in input order.
pub fn rank<'a>(chunks: &'a [Chunk], query: &str) -> Vec<ScoredChunk<'a>> {
    let terms = query_terms(query);
    let mut scored: Vec<ScoredChunk<'a>> = chunks
        .iter()
        .enumerate()
        .map(|(position, chunk)| ScoredChunk {
            chunk,
            score: score(chunk, &terms),
            position,
        })
        .collect();

    // stable: ties keep input order
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// The `limit` most relevant chunks, best first.
pub fn select(chunks: &[Chunk], query: &str, limit: usize) -> Vec<Chunk> {
    rank(chunks, query)
        .into_iter()
        .take(limit)
        .map(|s| s.chunk.clone())
        .collect()
}
