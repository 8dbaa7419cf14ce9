use std::time::Duration;

use async_trait::async_trait;
use ragtune_core::RetryableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("embedding call timed out after {0:?}")]
    Timeout(Duration),

    #[error("embedder not configured: {0}")]
    NotConfigured(String),
}

impl RetryableError for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            EmbeddingError::Api { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            EmbeddingError::Timeout(_) => true,
            EmbeddingError::DimensionMismatch { .. }
            | EmbeddingError::CountMismatch { .. }
            | EmbeddingError::NotConfigured(_) => false,
        }
    }

    fn timed_out(after: Duration) -> Self {
        EmbeddingError::Timeout(after)
    }
}

/// Trait for embedding backends (OpenAI, Ollama, ...)
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per input text (in order).
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// The dimensionality of the output vectors.
    fn dimensions(&self) -> usize;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text]).await?;
        if vectors.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual: vectors.len(),
            });
        }
        Ok(vectors.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        let api = |status| EmbeddingError::Api {
            status,
            body: String::new(),
        };
        assert!(api(429).is_retryable());
        assert!(api(503).is_retryable());
        assert!(api(408).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(!api(401).is_retryable());
        assert!(EmbeddingError::timed_out(Duration::from_secs(1)).is_retryable());
        assert!(!EmbeddingError::DimensionMismatch {
            expected: 3,
            actual: 4
        }
        .is_retryable());
    }
}
