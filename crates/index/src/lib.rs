//! Vector index collaborator: namespaced similarity search over chunk
//! embeddings.
//!
//! The tuning run treats the index as an opaque remote service. A namespace
//! holds the chunks of exactly one chunking configuration and is replaced
//! wholesale on rebuild.

pub mod memory;
pub mod remote;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ragtune_core::config::IndexConfig;
use ragtune_core::{RetryPolicy, RetryableError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::InMemoryIndex;
pub use remote::RemoteIndex;

// ── Types ──────────────────────────────────────────

/// A chunk and its embedding, ready for insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub source: String,
    pub chunk_index: usize,
    pub content: String,
    pub vector: Vec<f32>,
}

/// One nearest-neighbour match, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub source: String,
    pub chunk_index: usize,
    pub content: String,
    pub similarity: f32,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("index API error: {status}: {body}")]
    Api { status: u16, body: String },
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("failed to parse index response: {0}")]
    Parse(String),
    #[error("index not configured: {0}")]
    NotConfigured(String),
    #[error("index call timed out after {0:?}")]
    Timeout(Duration),
}

impl RetryableError for IndexError {
    fn is_retryable(&self) -> bool {
        match self {
            IndexError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            IndexError::Api { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            IndexError::Timeout(_) => true,
            IndexError::DimensionMismatch { .. }
            | IndexError::Parse(_)
            | IndexError::NotConfigured(_) => false,
        }
    }

    fn timed_out(after: Duration) -> Self {
        IndexError::Timeout(after)
    }
}

// ── Trait ──────────────────────────────────────────

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Remove everything in `namespace`, then insert `entries`.
    async fn replace(&self, namespace: &str, entries: Vec<IndexEntry>) -> Result<(), IndexError>;

    /// Up to `top_k` entries of `namespace` most similar to `vector`.
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, IndexError>;

    /// Number of entries in `namespace` (0 when it does not exist).
    async fn count(&self, namespace: &str) -> Result<usize, IndexError>;

    /// Drop `namespace` and everything in it. Unknown namespaces are not an error.
    async fn delete(&self, namespace: &str) -> Result<(), IndexError>;
}

/// Create the index backend named by `INDEX_PROVIDER`.
pub fn create_index(
    config: &IndexConfig,
    policy: RetryPolicy,
) -> Result<Arc<dyn VectorIndex>, IndexError> {
    match config.provider.as_str() {
        "memory" => Ok(Arc::new(InMemoryIndex::new())),
        "remote" => {
            let url = config
                .url
                .as_ref()
                .ok_or_else(|| IndexError::NotConfigured("INDEX_URL not set".into()))?;
            Ok(Arc::new(RemoteIndex::new(
                url.clone(),
                config.api_key.clone(),
                policy,
            )))
        }
        other => Err(IndexError::NotConfigured(format!(
            "unknown index provider: '{}'",
            other
        ))),
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn factory_requires_url_for_remote() {
        let mut config = IndexConfig {
            provider: "remote".into(),
            url: None,
            api_key: None,
            namespace_prefix: "ragtune".into(),
        };
        assert!(matches!(
            create_index(&config, RetryPolicy::default()).err(),
            Some(IndexError::NotConfigured(_))
        ));
        config.provider = "memory".into();
        assert!(create_index(&config, RetryPolicy::default()).is_ok());
    }

    #[test]
    fn client_errors_are_permanent() {
        let api = |status| IndexError::Api {
            status,
            body: String::new(),
        };
        assert!(api(503).is_retryable());
        assert!(!api(404).is_retryable());
        assert!(!IndexError::Parse("bad".into()).is_retryable());
    }
}
