//! Token estimation.
//!
//! A fixed heuristic of four characters per token, rounded down. Packing
//! decisions depend on exactly this arithmetic.

/// Estimated token cost of `text`: `chars / 4`, rounded down.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(estimate_tokens("test"), 1);
    }

    #[test]
    fn remainder_rounds_down() {
        assert_eq!(estimate_tokens("abc"), 0);
        assert_eq!(estimate_tokens("hello"), 1);
        assert_eq!(estimate_tokens("sevenchars"), 2);
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(estimate_tokens("éééé"), 1);
    }

    #[test]
    fn long_text() {
        assert_eq!(estimate_tokens(&"a".repeat(3200)), 800);
    }
}
