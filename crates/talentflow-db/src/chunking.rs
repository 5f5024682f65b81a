//! Sentence-aware chunking for job posting sections.
//!
//! Posting sections are split into chunks of roughly
//! [`CHUNK_MIN_SIZE`](talentflow_core::defaults::CHUNK_MIN_SIZE) to
//! [`CHUNK_MAX_SIZE`](talentflow_core::defaults::CHUNK_MAX_SIZE) characters,
//! packing whole sentences where possible and carrying a small overlap
//! between adjacent chunks for context preservation.
//!
//! # Example
//!
//! ```rust,ignore
//! use talentflow_db::chunking::{Chunker, SentenceChunker, ChunkerConfig};
//!
//! let chunker = SentenceChunker::new(ChunkerConfig::default());
//! let chunks = chunker.chunk("Your section text here.");
//! ```

use regex::Regex;

/// Configuration for chunking strategies.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum size of a chunk in characters.
    pub max_chunk_size: usize,
    /// Minimum size of a chunk in characters; a shorter trailing chunk
    /// is merged into its predecessor.
    pub min_chunk_size: usize,
    /// Number of characters to overlap between adjacent chunks.
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: talentflow_core::defaults::CHUNK_MAX_SIZE,
            min_chunk_size: talentflow_core::defaults::CHUNK_MIN_SIZE,
            overlap: talentflow_core::defaults::CHUNK_OVERLAP,
        }
    }
}

/// A text chunk with its ordinal position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The text content of the chunk.
    pub text: String,
    /// Ordinal of this chunk within the source text.
    pub index: usize,
}

/// Common trait for chunking strategies.
pub trait Chunker: Send + Sync {
    /// Chunk the given text into an ordered list of chunks.
    fn chunk(&self, text: &str) -> Vec<Chunk>;

    /// Get the configuration used by this chunker.
    fn config(&self) -> &ChunkerConfig;
}

/// Find a UTF-8 safe boundary at or before the given position.
fn find_char_boundary_before(text: &str, mut pos: usize) -> usize {
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Find a UTF-8 safe boundary at or after the given position.
fn find_char_boundary_after(text: &str, mut pos: usize) -> usize {
    while pos < text.len() && !text.is_char_boundary(pos) {
        pos += 1;
    }
    pos
}

/// Splits text at sentence boundaries using punctuation patterns.
///
/// Recognizes common sentence terminators (`.`, `!`, `?`) and skips
/// abbreviations and decimal numbers.
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    config: ChunkerConfig,
}

impl SentenceChunker {
    /// Create a new SentenceChunker with the given configuration.
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Split text into sentences, returned as string slices.
    fn find_sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let sentence_regex = Regex::new(r"[.!?]+(?:\s+|$)").unwrap();
        let abbrev_regex =
            Regex::new(r"(?i)\b(?:dr|mr|mrs|ms|prof|sr|jr|inc|ltd|co|etc|vs|e\.g|i\.e)\.$")
                .unwrap();

        let mut sentences = Vec::new();
        let mut last_end = 0;

        for mat in sentence_regex.find_iter(text) {
            let end = mat.end();
            let candidate = &text[last_end..end];

            if abbrev_regex.is_match(candidate.trim()) {
                continue;
            }

            // Preceded by a digit: likely a decimal, not a boundary
            let before_punct = mat.start();
            if before_punct > 0
                && text[..before_punct]
                    .chars()
                    .last()
                    .is_some_and(|c| c.is_ascii_digit())
            {
                continue;
            }

            sentences.push(&text[last_end..end]);
            last_end = end;
        }

        if last_end < text.len() && !text[last_end..].trim().is_empty() {
            sentences.push(&text[last_end..]);
        }

        sentences
    }

    /// Split an over-long sentence into max-sized pieces.
    fn split_long(&self, sentence: &str, out: &mut Vec<String>) {
        let mut offset = 0;
        while offset < sentence.len() {
            let raw_end = (offset + self.config.max_chunk_size).min(sentence.len());
            let end = find_char_boundary_before(sentence, raw_end);
            if end <= offset {
                break;
            }
            out.push(sentence[offset..end].to_string());
            offset = end;
        }
    }

    /// Overlap tail of the previous chunk, trimmed to a char boundary.
    fn overlap_tail(&self, chunk: &str) -> String {
        if self.config.overlap == 0 || chunk.len() <= self.config.overlap {
            return String::new();
        }
        let start = find_char_boundary_after(chunk, chunk.len() - self.config.overlap);
        chunk[start..].to_string()
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        let text = text.trim();
        if text.is_empty() {
            return vec![];
        }

        // Short sections become a single chunk regardless of min size.
        if text.len() <= self.config.max_chunk_size {
            return vec![Chunk {
                text: text.to_string(),
                index: 0,
            }];
        }

        let mut pieces: Vec<String> = Vec::new();
        let mut current = String::new();

        for sentence in self.find_sentences(text) {
            if sentence.len() > self.config.max_chunk_size {
                if !current.is_empty() {
                    pieces.push(std::mem::take(&mut current));
                }
                self.split_long(sentence, &mut pieces);
                continue;
            }

            if current.len() + sentence.len() > self.config.max_chunk_size {
                let tail = self.overlap_tail(&current);
                pieces.push(std::mem::take(&mut current));
                current = tail;
            }
            current.push_str(sentence);
        }

        if !current.trim().is_empty() {
            // Merge an undersized trailing chunk into its predecessor
            // when the combined size stays reasonable.
            let trimmed = current.trim().to_string();
            match pieces.last_mut() {
                Some(prev)
                    if trimmed.len() < self.config.min_chunk_size
                        && prev.len() + trimmed.len()
                            <= self.config.max_chunk_size + self.config.min_chunk_size =>
                {
                    prev.push_str(&trimmed);
                }
                _ => pieces.push(trimmed),
            }
        }

        pieces
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .enumerate()
            .map(|(index, text)| Chunk { text, index })
            .collect()
    }

    fn config(&self) -> &ChunkerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker() -> SentenceChunker {
        SentenceChunker::new(ChunkerConfig::default())
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunker().chunk("").is_empty());
        assert!(chunker().chunk("   ").is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunker().chunk("We are hiring a backend engineer.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "We are hiring a backend engineer.");
    }

    #[test]
    fn test_long_text_respects_max_size() {
        let sentence = "This role requires strong systems programming skills. ";
        let text = sentence.repeat(100); // ~5500 chars
        let chunks = chunker().chunk(&text);

        assert!(chunks.len() > 1);
        let config = ChunkerConfig::default();
        for chunk in &chunks {
            assert!(chunk.text.len() <= config.max_chunk_size + config.min_chunk_size);
        }
    }

    #[test]
    fn test_chunk_indices_are_sequential() {
        let text = "A sentence here. ".repeat(300);
        let chunks = chunker().chunk(&text);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn test_adjacent_chunks_share_overlap() {
        let text = "Distributed systems experience is required for this role. ".repeat(100);
        let chunks = chunker().chunk(&text);
        assert!(chunks.len() > 1);

        let config = ChunkerConfig::default();
        let first = &chunks[0].text;
        let tail = &first[first.len().saturating_sub(config.overlap / 2)..];
        assert!(chunks[1].text.contains(tail.trim()));
    }

    #[test]
    fn test_unsplittable_long_run_is_hard_split() {
        // No sentence boundaries at all
        let text = "x".repeat(5000);
        let chunks = chunker().chunk(&text);
        let config = ChunkerConfig::default();
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.text.len() <= config.max_chunk_size + config.min_chunk_size);
        }
    }

    #[test]
    fn test_abbreviations_do_not_split() {
        let text = format!(
            "Work with Dr. Smith on infrastructure. {}",
            "Ship reliable services every sprint. ".repeat(80)
        );
        let chunks = chunker().chunk(&text);
        // The abbreviation stays glued to its sentence
        assert!(chunks[0].text.contains("Dr. Smith on infrastructure."));
    }

    #[test]
    fn test_multibyte_text_is_safe() {
        let text = "Señor développeur très motivé. ".repeat(200);
        let chunks = chunker().chunk(&text);
        assert!(!chunks.is_empty());
        // Reconstructible as valid UTF-8 means no char was split
        for chunk in &chunks {
            assert!(chunk.text.is_char_boundary(chunk.text.len()));
        }
    }
}
