//! Budgeted context packing.
//!
//! Chunks are taken in the order given. Each costs `estimate_tokens` and
//! is appended followed by the delimiter. Packing stops at the first chunk
//! that would push the running total past the budget; later, smaller
//! chunks are not tried in its place.

use super::token::estimate_tokens;
use kbchat_core::Chunk;

pub const DEFAULT_MAX_TOKENS: usize = 3000;

/// Follows every included chunk, including the last.
pub const CHUNK_DELIMITER: &str = "\n\n---\n\n";

/// Packed context plus what the budget did to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedContext {
    pub text: String,
    /// Estimated tokens of the included chunks (delimiters not counted).
    pub tokens: usize,
    pub included: usize,
    pub dropped: usize,
}

pub fn pack_with_stats(chunks: &[Chunk], max_tokens: usize) -> PackedContext {
    let mut packed = PackedContext::default();

    for chunk in chunks {
        let cost = estimate_tokens(chunk);
        if packed.tokens + cost > max_tokens {
            break;
        }
        packed.text.push_str(chunk);
        packed.text.push_str(CHUNK_DELIMITER);
        packed.tokens += cost;
        packed.included += 1;
    }

    packed.dropped = chunks.len() - packed.included;
    packed
}

/// Concatenate chunks within `max_tokens`. Never fails.
pub fn pack(chunks: &[Chunk], max_tokens: usize) -> String {
    pack_with_stats(chunks, max_tokens).text
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A chunk whose estimated cost is exactly `tokens`.
    fn chunk_of_cost(tag: char, tokens: usize) -> Chunk {
        Chunk::new(tag.to_string().repeat(tokens * 4))
    }

    #[test]
    fn stops_before_exceeding_budget() {
        let chunks: Vec<Chunk> = ['a', 'b', 'c', 'd']
            .into_iter()
            .map(|t| chunk_of_cost(t, 800))
            .collect();

        let packed = pack_with_stats(&chunks, 3000);
        assert_eq!(packed.included, 3);
        assert_eq!(packed.dropped, 1);
        assert_eq!(packed.tokens, 2400);

        let expected = format!(
            "{}{CHUNK_DELIMITER}{}{CHUNK_DELIMITER}{}{CHUNK_DELIMITER}",
            chunks[0], chunks[1], chunks[2]
        );
        assert_eq!(packed.text, expected);
        assert!(!packed.text.contains('d'));
    }

    #[test]
    fn empty_input_is_empty_string() {
        assert_eq!(pack(&[], DEFAULT_MAX_TOKENS), "");
        assert_eq!(pack_with_stats(&[], 0), PackedContext::default());
    }

    #[test]
    fn no_best_fit_after_a_skip() {
        let chunks = vec![
            chunk_of_cost('a', 100),
            chunk_of_cost('b', 500),
            chunk_of_cost('c', 10),
        ];
        let packed = pack_with_stats(&chunks, 200);
        assert_eq!(packed.included, 1);
        assert_eq!(packed.dropped, 2);
        assert!(!packed.text.contains('c'));
    }

    #[test]
    fn exact_budget_fits() {
        let chunks = vec![chunk_of_cost('a', 1500), chunk_of_cost('b', 1500)];
        let packed = pack_with_stats(&chunks, 3000);
        assert_eq!(packed.included, 2);
        assert_eq!(packed.tokens, 3000);
    }

    #[test]
    fn tiny_chunks_cost_nothing() {
        // "abc" estimates to zero tokens, so it always fits
        let chunks = vec![Chunk::from("abc"), Chunk::from("xyz")];
        let packed = pack_with_stats(&chunks, 0);
        assert_eq!(packed.included, 2);
        assert_eq!(packed.text, format!("abc{CHUNK_DELIMITER}xyz{CHUNK_DELIMITER}"));
    }

    #[test]
    fn preserves_given_order() {
        let chunks = vec![Chunk::from("second"), Chunk::from("first")];
        let text = pack(&chunks, DEFAULT_MAX_TOKENS);
        assert!(text.find("second").unwrap() < text.find("first").unwrap());
    }
}
