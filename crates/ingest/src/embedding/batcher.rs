use std::sync::Arc;

use super::traits::{Embedder, EmbeddingError};

/// Buffers keyed texts and embeds them `batch_size` at a time. Keys travel
/// with their vectors so callers can attach results to whatever they index.
pub struct EmbeddingBatcher<K> {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    keys: Vec<K>,
    texts: Vec<String>,
    batches_sent: usize,
}

impl<K> EmbeddingBatcher<K> {
    pub fn new(embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            embedder,
            batch_size,
            keys: Vec::with_capacity(batch_size),
            texts: Vec::with_capacity(batch_size),
            batches_sent: 0,
        }
    }

    /// Queue one text. When the buffer reaches `batch_size` it is embedded
    /// and the keyed vectors are returned.
    pub async fn add(
        &mut self,
        key: K,
        text: String,
    ) -> Result<Option<Vec<(K, Vec<f32>)>>, EmbeddingError> {
        self.keys.push(key);
        self.texts.push(text);
        if self.texts.len() < self.batch_size {
            return Ok(None);
        }
        self.flush().await.map(Some)
    }

    /// Embed whatever is buffered.
    pub async fn flush(&mut self) -> Result<Vec<(K, Vec<f32>)>, EmbeddingError> {
        if self.texts.is_empty() {
            return Ok(Vec::new());
        }
        let keys = std::mem::take(&mut self.keys);
        let texts = std::mem::take(&mut self.texts);

        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = self.embedder.embed_batch(&refs).await?;
        self.batches_sent += 1;
        if vectors.len() != keys.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: keys.len(),
                actual: vectors.len(),
            });
        }
        Ok(keys.into_iter().zip(vectors).collect())
    }

    pub fn pending(&self) -> usize {
        self.texts.len()
    }

    /// Embedding requests issued so far.
    pub fn batches_sent(&self) -> usize {
        self.batches_sent
    }
}
