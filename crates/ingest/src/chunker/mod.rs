//! Deterministic document chunking.
//!
//! Every strategy implements [`Chunker`] and yields a lazy sequence of
//! [`Chunk`]s. Calling `chunk` again with the same text and config restarts
//! the sequence and produces exactly the same chunks.

mod helpers;
mod strategies;
mod types;

pub use strategies::{FixedSizeChunker, SemanticChunker, WordWindowChunker};
pub use types::{Chunk, Chunks};

use ragtune_core::{ChunkConfig, ChunkStrategy, ConfigurationError};

/// Common contract for chunking strategies.
pub trait Chunker: Send + Sync {
    fn strategy(&self) -> ChunkStrategy;

    /// Split `text` according to `config`. Fails before yielding anything if
    /// `config` is invalid (e.g. overlap >= chunk_size).
    fn chunk<'a>(
        &self,
        text: &'a str,
        config: &ChunkConfig,
    ) -> Result<Chunks<'a>, ConfigurationError>;
}

static FIXED: FixedSizeChunker = FixedSizeChunker;
static WORDS: WordWindowChunker = WordWindowChunker;
static SEMANTIC: SemanticChunker = SemanticChunker;

/// The chunker implementing `strategy`.
pub fn chunker_for(strategy: ChunkStrategy) -> &'static dyn Chunker {
    match strategy {
        ChunkStrategy::Fixed => &FIXED,
        ChunkStrategy::Words => &WORDS,
        ChunkStrategy::Semantic => &SEMANTIC,
    }
}

/// Chunk `text` with the strategy named by `config.strategy`.
pub fn chunk_text<'a>(text: &'a str, config: &ChunkConfig) -> Result<Chunks<'a>, ConfigurationError> {
    chunker_for(config.strategy).chunk(text, config)
}

#[cfg(test)]
mod tests;
