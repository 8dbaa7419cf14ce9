pub mod chunker;
pub mod document;
pub mod embedding;

pub use chunker::{chunk_text, chunker_for, Chunk, Chunker, Chunks};
pub use document::{Corpus, Document, ExtractionError};
pub use embedding::{Embedder, EmbeddingError};
