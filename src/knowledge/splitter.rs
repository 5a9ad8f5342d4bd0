//! Overlapping fixed-window text splitter
//!
//! A window of `chunk_size` characters slides over the content, advancing by
//! `chunk_size - overlap` each step. Windows whose trimmed text is shorter
//! than `min_chunk_chars` are dropped, which can drop the tail window.
//! Kept windows are numbered from 0 in generation order.
//!
//! Offsets are character offsets, so multi-byte text never splits inside a
//! code point.
//!
//! # Example
//!
//! ```rust
//! use context_memory::knowledge::ChunkSplitter;
//!
//! let splitter = ChunkSplitter::new(1000, 100).unwrap();
//! let spans = splitter.split(&"x".repeat(2500));
//! let starts: Vec<usize> = spans.iter().map(|s| s.start).collect();
//! assert_eq!(starts, vec![0, 900, 1800]);
//! ```

use crate::config::KnowledgeBaseConfig;
use crate::error::{ContextError, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_OVERLAP: usize = 100;
pub const DEFAULT_MIN_CHUNK_CHARS: usize = 50;

/// One window of the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    pub index: usize,
    /// Inclusive character offset
    pub start: usize,
    /// Exclusive character offset
    pub end: usize,
    pub text: String,
}

impl ChunkSpan {
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// Deterministic overlapping splitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSplitter {
    chunk_size: usize,
    overlap: usize,
    min_chunk_chars: usize,
}

impl ChunkSplitter {
    /// Create a splitter; `overlap` must be strictly less than `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(ContextError::Configuration(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(ContextError::Configuration(format!(
                "overlap ({}) must be less than chunk_size ({})",
                overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            overlap,
            min_chunk_chars: DEFAULT_MIN_CHUNK_CHARS,
        })
    }

    pub fn from_config(config: &KnowledgeBaseConfig) -> Result<Self> {
        Ok(Self::new(config.chunk_size, config.chunk_overlap)?
            .with_min_chunk_chars(config.min_chunk_chars))
    }

    pub fn with_min_chunk_chars(mut self, min_chunk_chars: usize) -> Self {
        self.min_chunk_chars = min_chunk_chars;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between consecutive window starts
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Split content into kept windows
    pub fn split(&self, content: &str) -> Vec<ChunkSpan> {
        // Byte offset of every char boundary, including the end
        let boundaries: Vec<usize> = content
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(content.len()))
            .collect();
        let char_len = boundaries.len() - 1;

        let mut spans = Vec::new();
        let mut start = 0;
        while start < char_len {
            let end = (start + self.chunk_size).min(char_len);
            let text = &content[boundaries[start]..boundaries[end]];

            if text.trim().chars().count() >= self.min_chunk_chars {
                spans.push(ChunkSpan {
                    index: spans.len(),
                    start,
                    end,
                    text: text.to_string(),
                });
            }

            start += self.stride();
        }

        spans
    }
}

impl Default for ChunkSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            min_chunk_chars: DEFAULT_MIN_CHUNK_CHARS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> String {
        "abcdefghijklmnopqrstuvwxyz"
            .chars()
            .cycle()
            .take(len)
            .collect()
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(ChunkSplitter::new(100, 100).is_err());
        assert!(ChunkSplitter::new(100, 150).is_err());
        assert!(ChunkSplitter::new(0, 0).is_err());
        assert!(ChunkSplitter::new(100, 99).is_ok());
    }

    #[test]
    fn test_consistent_strides() {
        let content = sample(2500);
        let spans = ChunkSplitter::default().split(&content);

        assert_eq!(spans.len(), 3);
        assert_eq!(
            spans.iter().map(|s| (s.start, s.end)).collect::<Vec<_>>(),
            vec![(0, 1000), (900, 1900), (1800, 2500)]
        );
        for pair in spans.windows(2) {
            assert_eq!(pair[1].start - pair[0].start, 900);
        }
        assert!(spans.iter().all(|s| s.char_len() >= 50));
    }

    #[test]
    fn test_spans_cover_content() {
        let content = sample(2500);
        let spans = ChunkSplitter::default().split(&content);

        let mut covered = 0;
        for span in &spans {
            assert!(span.start <= covered);
            assert_eq!(span.text, &content[span.start..span.end]);
            covered = covered.max(span.end);
        }
        assert_eq!(covered, content.len());
    }

    #[test]
    fn test_short_tail_dropped() {
        // Windows start at 0 and 900; the second holds 930 chars, the third
        // would start at 1800 with 30 chars and is dropped.
        let content = sample(1830);
        let spans = ChunkSplitter::default().split(&content);

        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].end, 1830);
    }

    #[test]
    fn test_whitespace_tail_dropped() {
        let content = format!("{}{}", sample(950), " ".repeat(1000));
        let spans = ChunkSplitter::default().split(&content);

        // [900, 1900) holds 50 letters, [1800, 1950) only spaces
        assert_eq!(spans.len(), 2);
        assert_eq!(spans.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_content_below_minimum() {
        assert!(ChunkSplitter::default().split(&"word ".repeat(5)).is_empty());
        assert!(ChunkSplitter::default().split("").is_empty());
    }

    #[test]
    fn test_multibyte_offsets_are_characters() {
        let content: String = "é".repeat(120);
        let splitter = ChunkSplitter::new(100, 10).unwrap().with_min_chunk_chars(10);
        let spans = splitter.split(&content);

        assert_eq!(spans.len(), 2);
        assert_eq!((spans[1].start, spans[1].end), (90, 120));
        assert_eq!(spans[0].text.chars().count(), 100);
    }

    #[test]
    fn test_indices_follow_generation_order() {
        let content = format!("{}{}{}", sample(300), " ".repeat(300), sample(300));
        let splitter = ChunkSplitter::new(100, 0).unwrap();
        let spans = splitter.split(&content);

        assert_eq!(spans.len(), 6);
        for (i, span) in spans.iter().enumerate() {
            assert_eq!(span.index, i);
        }
        assert_eq!(spans[3].start, 600);
    }
}
