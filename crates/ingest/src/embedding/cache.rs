use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use super::traits::{Embedder, EmbeddingError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

/// Least-recently-used map from exact text to its vector.
pub struct EmbeddingCache {
    entries: LruCache<String, Vec<f32>>,
    hits: u64,
    misses: u64,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, text: &str) -> Option<Vec<f32>> {
        match self.entries.get(text) {
            Some(vector) => {
                self.hits += 1;
                Some(vector.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, text: &str, vector: Vec<f32>) {
        self.entries.put(text.to_string(), vector);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

/// Serves repeated texts from an [`EmbeddingCache`]. Evaluation questions are
/// embedded once per run instead of once per configuration.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Mutex<EmbeddingCache>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(EmbeddingCache::new(capacity)),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out: Vec<Option<Vec<f32>>> = {
            let mut cache = self.cache.lock().await;
            texts.iter().map(|t| cache.get(t)).collect()
        };

        // Each distinct missing text is sent once, however often it repeats.
        let mut misses: Vec<&str> = Vec::new();
        let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, text) in texts.iter().enumerate() {
            if out[i].is_none() {
                let slots = positions.entry(*text).or_default();
                if slots.is_empty() {
                    misses.push(*text);
                }
                slots.push(i);
            }
        }
        if misses.is_empty() {
            return Ok(out.into_iter().flatten().collect());
        }

        debug!(requested = texts.len(), missing = misses.len(), "embedding cache miss");
        let fresh = self.inner.embed_batch(&misses).await?;
        if fresh.len() != misses.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: misses.len(),
                actual: fresh.len(),
            });
        }

        let mut cache = self.cache.lock().await;
        for (text, vector) in misses.iter().zip(fresh) {
            cache.put(text, vector.clone());
            for &i in &positions[text] {
                out[i] = Some(vector.clone());
            }
        }
        Ok(out.into_iter().flatten().collect())
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}
