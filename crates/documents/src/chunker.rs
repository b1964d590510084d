//! Sliding-window chunker.
//!
//! Text is cut into windows of `size` characters, each starting
//! `size - overlap` characters after the previous one. Boundaries ignore
//! sentences and rows entirely. Windows shorter than the minimum length
//! (in practice only the tail) are dropped so that near-empty fragments
//! never reach relevance scoring.
//!
//! Lengths are counted in Unicode scalar values, never bytes, so a window
//! can't split a multi-byte character.

use kbchat_core::{Chunk, Error, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_OVERLAP: usize = 100;
pub const MIN_CHUNK_CHARS: usize = 50;

/// Validated chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
    min_chunk_chars: usize,
}

impl Chunker {
    /// Fails with `InvalidConfig` unless `overlap < size`.
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::invalid_config("chunk size must be greater than zero"));
        }
        if overlap >= size {
            return Err(Error::invalid_config(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({size})"
            )));
        }
        Ok(Self {
            size,
            overlap,
            min_chunk_chars: MIN_CHUNK_CHARS,
        })
    }

    pub fn with_min_chunk_chars(mut self, min_chunk_chars: usize) -> Self {
        self.min_chunk_chars = min_chunk_chars;
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the starts of consecutive windows.
    pub fn step(&self) -> usize {
        self.size - self.overlap
    }

    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();

        (0..chars.len())
            .step_by(self.step())
            .filter_map(|start| {
                let end = (start + self.size).min(chars.len());
                let window = &chars[start..end];
                (window.len() >= self.min_chunk_chars)
                    .then(|| Chunk::new(window.iter().collect::<String>()))
            })
            .collect()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            min_chunk_chars: MIN_CHUNK_CHARS,
        }
    }
}

/// Chunk `text` with explicit parameters.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    Ok(Chunker::new(size, overlap)?.chunk(text))
}
