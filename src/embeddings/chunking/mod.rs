#[cfg(test)]
mod tests;

use std::collections::VecDeque;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::{RagError, Result};

/// Configuration for sentence-aware chunking. Sizes are measured in characters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Upper bound on a chunk's length, exceeded only by a single oversized sentence
    pub chunk_size: usize,
    /// Budget for the trailing sentences repeated at the start of the next chunk
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Splits text into overlapping chunks that never cut through a sentence
#[derive(Debug, Clone, Copy)]
pub struct SentenceChunker {
    config: ChunkingConfig,
}

impl SentenceChunker {
    #[inline]
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Lazily produce the chunks of `text` in document order
    #[inline]
    pub fn chunks(&self, text: &str) -> Chunks {
        Chunks {
            pending: split_sentences(text).into(),
            current: Vec::new(),
            has_fresh: false,
            config: self.config,
        }
    }
}

/// Iterator over the chunks of a document.
///
/// `current` holds the sentences of the chunk being built. After a chunk is
/// emitted it is re-seeded with the overlap suffix; `has_fresh` tracks whether
/// anything beyond that seed has been added, so a chunk is never pure overlap.
#[derive(Debug, Clone)]
pub struct Chunks {
    pending: VecDeque<String>,
    current: Vec<String>,
    has_fresh: bool,
    config: ChunkingConfig,
}

impl Iterator for Chunks {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(sentence) = self.pending.front() else {
                if !self.has_fresh {
                    return None;
                }
                self.has_fresh = false;
                let chunk = self.current.join(" ");
                self.current.clear();
                return Some(chunk);
            };

            let sentence_len = sentence.chars().count();
            let combined_len = if self.current.is_empty() {
                sentence_len
            } else {
                joined_len(&self.current) + 1 + sentence_len
            };

            if combined_len > self.config.chunk_size && !self.current.is_empty() {
                if self.has_fresh {
                    let chunk = self.current.join(" ");
                    self.seed_overlap();
                    return Some(chunk);
                }
                // Only overlap is left and it crowds out the next sentence
                self.current.remove(0);
                continue;
            }

            if let Some(sentence) = self.pending.pop_front() {
                self.current.push(sentence);
                self.has_fresh = true;
            }
        }
    }
}

impl Chunks {
    /// Keep the longest run of trailing sentences that fits in the overlap budget
    fn seed_overlap(&mut self) {
        let mut kept = 0;
        let mut kept_len = 0;
        for sentence in self.current.iter().rev() {
            let separator = usize::from(kept > 0);
            let next_len = kept_len + separator + sentence.chars().count();
            if next_len > self.config.chunk_overlap {
                break;
            }
            kept_len = next_len;
            kept += 1;
        }

        let drop = self.current.len() - kept;
        self.current.drain(..drop);
        self.has_fresh = false;
    }
}

/// Split a document into trimmed sentences using Unicode sentence boundaries.
///
/// Whitespace runs are collapsed first so hard-wrapped lines do not become
/// sentences of their own.
#[inline]
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = text.split_whitespace().join(" ");
    normalized
        .split_sentence_bounds()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .map(str::to_string)
        .collect()
}

/// Chunk a document, failing when it holds no readable text
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    if text.trim().is_empty() {
        return Err(RagError::EmptyDocument);
    }

    let chunks: Vec<String> = SentenceChunker::new(*config).chunks(text).collect();
    if chunks.is_empty() {
        return Err(RagError::EmptyDocument);
    }

    debug!(
        "Chunked {} chars into {} chunks (avg {} tokens)",
        text.len(),
        chunks.len(),
        chunks
            .iter()
            .map(|c| estimate_token_count(c))
            .sum::<usize>()
            / chunks.len()
    );

    Ok(chunks)
}

fn joined_len(sentences: &[String]) -> usize {
    let chars: usize = sentences.iter().map(|s| s.chars().count()).sum();
    chars + sentences.len().saturating_sub(1)
}

/// Estimate token count using a simple heuristic
/// This is a rough approximation - actual tokenization would be more accurate
#[inline]
pub fn estimate_token_count(text: &str) -> usize {
    // Rough heuristic: 1 token ≈ 0.75 words for English text
    // Add extra tokens for punctuation and special characters
    let word_count = text.split_whitespace().count();
    let punct_count = text.chars().filter(|c| c.is_ascii_punctuation()).count();

    (punct_count as f64).mul_add(0.1, word_count as f64 / 0.75) as usize
}
