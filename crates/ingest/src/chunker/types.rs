//! Chunk output types.

/// A contiguous slice of document text sized for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based index within the document.
    pub index: usize,
    /// The chunk text content.
    pub content: String,
    /// Byte offset in the source text where this chunk's own content starts
    /// (for `semantic`, after the carried-over overlap).
    pub offset: usize,
}

/// Lazy chunk sequence borrowing the source text.
pub type Chunks<'a> = Box<dyn Iterator<Item = Chunk> + Send + 'a>;
