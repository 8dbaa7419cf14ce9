//! Process-local index with exact cosine search.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{cosine_similarity, IndexEntry, IndexError, SearchHit, VectorIndex};

#[derive(Default)]
pub struct InMemoryIndex {
    namespaces: RwLock<HashMap<String, Vec<IndexEntry>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespaces currently holding at least one entry, sorted.
    pub async fn namespaces(&self) -> Vec<String> {
        let guard = self.namespaces.read().await;
        let mut names: Vec<String> = guard
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

fn check_dimensions(entries: &[IndexEntry]) -> Result<(), IndexError> {
    if let Some(first) = entries.first() {
        let expected = first.vector.len();
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != expected) {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: bad.vector.len(),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn replace(&self, namespace: &str, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        check_dimensions(&entries)?;
        let mut guard = self.namespaces.write().await;
        guard.insert(namespace.to_string(), entries);
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, IndexError> {
        let guard = self.namespaces.read().await;
        let Some(entries) = guard.get(namespace) else {
            return Ok(Vec::new());
        };
        if let Some(first) = entries.first() {
            if first.vector.len() != vector.len() {
                return Err(IndexError::DimensionMismatch {
                    expected: first.vector.len(),
                    actual: vector.len(),
                });
            }
        }

        let mut hits: Vec<SearchHit> = entries
            .iter()
            .map(|e| SearchHit {
                id: e.id.clone(),
                source: e.source.clone(),
                chunk_index: e.chunk_index,
                content: e.content.clone(),
                similarity: cosine_similarity(&e.vector, vector),
            })
            .collect();
        // Ties break by id so equal scores stay in a stable order.
        hits.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn count(&self, namespace: &str) -> Result<usize, IndexError> {
        let guard = self.namespaces.read().await;
        Ok(guard.get(namespace).map(Vec::len).unwrap_or(0))
    }

    async fn delete(&self, namespace: &str) -> Result<(), IndexError> {
        self.namespaces.write().await.remove(namespace);
        Ok(())
    }
}
