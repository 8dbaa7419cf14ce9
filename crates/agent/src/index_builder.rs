//! Chunk, embed and load a corpus into one index namespace.

use std::sync::Arc;
use std::time::Instant;

use ragtune_core::ChunkConfig;
use ragtune_index::{IndexEntry, IndexError, VectorIndex};
use ragtune_ingest::embedding::EmbeddingBatcher;
use ragtune_ingest::{chunk_text, Corpus, Embedder};
use tracing::{debug, info};

use crate::error::IndexRebuildError;

/// Exclusive handle on an index namespace built for exactly one
/// [`ChunkConfig`]. Not `Clone`: whoever holds it owns the built index, and
/// evaluation borrows it read-only.
pub struct IndexHandle {
    namespace: String,
    chunk_config: ChunkConfig,
    chunk_count: usize,
    index: Arc<dyn VectorIndex>,
}

impl IndexHandle {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn chunk_config(&self) -> &ChunkConfig {
        &self.chunk_config
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub(crate) fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    /// Give the index back: the namespace is deleted and the handle consumed.
    pub async fn release(self) -> Result<(), IndexError> {
        debug!(namespace = %self.namespace, "releasing index namespace");
        self.index.delete(&self.namespace).await
    }
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle")
            .field("namespace", &self.namespace)
            .field("chunk_config", &self.chunk_config)
            .field("chunk_count", &self.chunk_count)
            .finish()
    }
}

pub struct IndexBuilder {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    namespace_prefix: String,
}

impl IndexBuilder {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        batch_size: usize,
        namespace_prefix: impl Into<String>,
    ) -> Self {
        Self {
            index,
            embedder,
            batch_size: batch_size.max(1),
            namespace_prefix: namespace_prefix.into(),
        }
    }

    /// `{prefix}-{corpus fingerprint}-{chunk slug}`
    pub fn namespace_for(&self, corpus: &Corpus, chunk: &ChunkConfig) -> String {
        format!(
            "{}-{}-{}",
            self.namespace_prefix,
            corpus.short_fingerprint(),
            chunk.slug()
        )
    }

    /// Re-chunk the whole corpus under `chunk`, embed every chunk in batches
    /// and replace the namespace contents.
    pub async fn rebuild(
        &self,
        corpus: &Corpus,
        chunk: &ChunkConfig,
    ) -> Result<IndexHandle, IndexRebuildError> {
        chunk.validate()?;
        if corpus.is_empty() {
            return Err(IndexRebuildError::EmptyCorpus);
        }

        let start = Instant::now();
        let namespace = self.namespace_for(corpus, chunk);
        info!(namespace = %namespace, chunk = %chunk, "rebuilding index");

        let mut batcher = EmbeddingBatcher::new(self.embedder.clone(), self.batch_size);
        let mut entries: Vec<IndexEntry> = Vec::new();

        for doc in &corpus.documents {
            for piece in chunk_text(&doc.text, chunk)? {
                if piece.content.trim().is_empty() {
                    continue;
                }
                let key = entries.len();
                entries.push(IndexEntry {
                    id: format!("{}:{}", doc.id, piece.index),
                    source: doc.id.clone(),
                    chunk_index: piece.index,
                    content: piece.content.clone(),
                    vector: Vec::new(),
                });
                if let Some(batch) = batcher.add(key, piece.content).await? {
                    attach(&mut entries, batch);
                }
            }
        }
        let rest = batcher.flush().await?;
        attach(&mut entries, rest);

        if entries.is_empty() {
            return Err(IndexRebuildError::NoChunks);
        }

        let chunk_count = entries.len();
        debug!(namespace = %namespace, chunk_count, "writing index");
        self.index.replace(&namespace, entries).await?;

        info!(
            namespace = %namespace,
            chunk_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "index ready"
        );
        Ok(IndexHandle {
            namespace,
            chunk_config: *chunk,
            chunk_count,
            index: self.index.clone(),
        })
    }
}

fn attach(entries: &mut [IndexEntry], batch: Vec<(usize, Vec<f32>)>) {
    for (key, vector) in batch {
        if let Some(entry) = entries.get_mut(key) {
            entry.vector = vector;
        }
    }
}
