//! Chunking strategies: fixed character windows, word windows and
//! paragraph/sentence packing.

use ragtune_core::{ChunkConfig, ChunkStrategy, ConfigurationError};

use super::helpers::{advance_chars, offset_in, pack_fragments, split_fragments, tail_chars};
use super::types::{Chunk, Chunks};
use super::Chunker;

// ── Fixed character windows ─────────────────────────────────────────────────

/// Windows of `chunk_size` characters whose starts are `chunk_size - overlap`
/// characters apart. Consecutive chunks share exactly `overlap` characters;
/// the last chunk may be shorter.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSizeChunker;

impl Chunker for FixedSizeChunker {
    fn strategy(&self) -> ChunkStrategy {
        ChunkStrategy::Fixed
    }

    fn chunk<'a>(&self, text: &'a str, config: &ChunkConfig) -> Result<Chunks<'a>, ConfigurationError> {
        config.validate()?;
        Ok(Box::new(CharWindows {
            text,
            next_start: (!text.is_empty()).then_some(0),
            size: config.chunk_size,
            step: config.step(),
            index: 0,
        }))
    }
}

#[derive(Debug, Clone)]
struct CharWindows<'a> {
    text: &'a str,
    next_start: Option<usize>,
    size: usize,
    step: usize,
    index: usize,
}

impl Iterator for CharWindows<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let start = self.next_start?;
        let end = advance_chars(self.text, start, self.size);
        self.next_start = if end >= self.text.len() {
            None
        } else {
            Some(advance_chars(self.text, start, self.step))
        };

        let chunk = Chunk {
            index: self.index,
            content: self.text[start..end].to_string(),
            offset: start,
        };
        self.index += 1;
        Some(chunk)
    }
}

// ── Word windows ────────────────────────────────────────────────────────────

/// Windows of `chunk_size` whitespace tokens, `overlap` tokens shared between
/// neighbours. Tokens are re-joined with single spaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordWindowChunker;

impl Chunker for WordWindowChunker {
    fn strategy(&self) -> ChunkStrategy {
        ChunkStrategy::Words
    }

    fn chunk<'a>(&self, text: &'a str, config: &ChunkConfig) -> Result<Chunks<'a>, ConfigurationError> {
        config.validate()?;
        let words: Vec<&'a str> = text.split_whitespace().collect();
        Ok(Box::new(WordWindows {
            text,
            next_start: (!words.is_empty()).then_some(0),
            words,
            size: config.chunk_size,
            step: config.step(),
            index: 0,
        }))
    }
}

#[derive(Debug, Clone)]
struct WordWindows<'a> {
    text: &'a str,
    words: Vec<&'a str>,
    next_start: Option<usize>,
    size: usize,
    step: usize,
    index: usize,
}

impl Iterator for WordWindows<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let start = self.next_start?;
        let end = (start + self.size).min(self.words.len());
        self.next_start = (end < self.words.len()).then_some(start + self.step);

        let chunk = Chunk {
            index: self.index,
            content: self.words[start..end].join(" "),
            offset: offset_in(self.text, self.words[start]),
        };
        self.index += 1;
        Some(chunk)
    }
}

// ── Semantic packing ────────────────────────────────────────────────────────

/// Paragraphs, then sentences, packed greedily into bodies. Every chunk after
/// the first starts with the last `overlap` characters of the previous chunk,
/// then a newline, then its own body. Bodies leave room for both, so no chunk
/// exceeds `chunk_size` characters. With a one-character body budget the
/// newline is left out.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticChunker;

impl Chunker for SemanticChunker {
    fn strategy(&self) -> ChunkStrategy {
        ChunkStrategy::Semantic
    }

    fn chunk<'a>(&self, text: &'a str, config: &ChunkConfig) -> Result<Chunks<'a>, ConfigurationError> {
        config.validate()?;
        let step = config.step();
        let separator = config.overlap > 0 && step > 1;
        let budget = if separator { step - 1 } else { step };
        let fragments = split_fragments(text, budget);
        let bodies = pack_fragments(text, &fragments, budget);
        Ok(Box::new(PackedChunks {
            bodies: bodies.into_iter(),
            overlap: config.overlap,
            separator,
            previous: None,
            index: 0,
        }))
    }
}

struct PackedChunks {
    bodies: std::vec::IntoIter<(usize, String)>,
    overlap: usize,
    separator: bool,
    previous: Option<String>,
    index: usize,
}

impl Iterator for PackedChunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let (offset, body) = self.bodies.next()?;
        let content = match (&self.previous, self.overlap) {
            (Some(prev), overlap) if overlap > 0 => {
                let sep = if self.separator { "\n" } else { "" };
                format!("{}{sep}{}", tail_chars(prev, overlap), body)
            }
            _ => body,
        };
        self.previous = Some(content.clone());

        let chunk = Chunk {
            index: self.index,
            content,
            offset,
        };
        self.index += 1;
        Some(chunk)
    }
}
