use std::sync::Arc;

use async_trait::async_trait;
use ragtune_core::RetryPolicy;

use super::traits::{Embedder, EmbeddingError};

/// Applies the shared [`RetryPolicy`] (per-call timeout, bounded retries with
/// backoff) to every call of the wrapped embedder.
pub struct RetryingEmbedder {
    inner: Arc<dyn Embedder>,
    policy: RetryPolicy,
}

impl RetryingEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl Embedder for RetryingEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.policy
            .run("embed_batch", || self.inner.embed_batch(texts))
            .await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FlakyEmbedder {
        calls: AtomicUsize,
        failures: usize,
        status: u16,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(EmbeddingError::Api {
                    status: self.status,
                    body: "nope".into(),
                });
            }
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }

        fn dimensions(&self) -> usize {
            1
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_factor: 2.0,
            call_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn rate_limit_is_retried() {
        let inner = Arc::new(FlakyEmbedder {
            calls: AtomicUsize::new(0),
            failures: 2,
            status: 429,
        });
        let embedder = RetryingEmbedder::new(inner.clone(), policy());
        let vectors = embedder.embed_batch(&["q"]).await.unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn bad_request_is_not_retried() {
        let inner = Arc::new(FlakyEmbedder {
            calls: AtomicUsize::new(0),
            failures: 5,
            status: 400,
        });
        let embedder = RetryingEmbedder::new(inner.clone(), policy());
        let err = embedder.embed_batch(&["q"]).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Api { status: 400, .. }));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
