//! Character-window chunking with sentence-aware cut points.

use serde::{Deserialize, Serialize};

use crate::core::config::IngestConfig;

/// A text chunk with source information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    /// Source identifier (file name)
    pub source: String,
    /// Character offset in original document
    pub start_offset: usize,
    /// Chunk index within the source
    pub chunk_index: usize,
}

#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split text into overlapping chunks.
    ///
    /// Each window is cut back to the last sentence end in its final fifth
    /// when one exists; the next window starts `chunk_overlap` characters
    /// before the cut, so no text is skipped.
    pub fn split(&self, text: &str, source: &str) -> Vec<TextChunk> {
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();
        let mut chunks = Vec::new();

        let mut start = 0;
        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            let window = &chars[start..end];
            let cut = if end < total_chars {
                sentence_cut(window)
            } else {
                window.len()
            };

            let chunk_text: String = window[..cut].iter().collect();
            let trimmed = chunk_text.trim();
            if !trimmed.is_empty() {
                chunks.push(TextChunk {
                    text: trimmed.to_string(),
                    source: source.to_string(),
                    start_offset: start,
                    chunk_index: chunks.len(),
                });
            }

            if end == total_chars {
                break;
            }
            start += cut.saturating_sub(self.chunk_overlap).max(1);
        }

        chunks
    }
}

/// Length of the window up to the last sentence ending found in its final
/// 20%, or the whole window.
fn sentence_cut(window: &[char]) -> usize {
    let search_start = (window.len() * 80) / 100;
    for pos in (search_start..window.len()).rev() {
        let is_terminal = matches!(window[pos], '.' | '!' | '?');
        let followed_by_space = window
            .get(pos + 1)
            .map(|c| c.is_whitespace())
            .unwrap_or(false);
        if is_terminal && followed_by_space {
            return pos + 2;
        }
    }
    window.len()
}
