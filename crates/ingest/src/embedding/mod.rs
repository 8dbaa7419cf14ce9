pub mod batcher;
pub mod cache;
mod http;
pub mod ollama;
pub mod openai;
pub mod retrying;
pub mod traits;

pub use batcher::EmbeddingBatcher;
pub use cache::{CacheStats, CachedEmbedder, EmbeddingCache};
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use retrying::RetryingEmbedder;
pub use traits::{Embedder, EmbeddingError};

use std::sync::Arc;

use ragtune_core::config::{EmbeddingConfig, LlmConfig, OllamaConfig};

/// Create the embedding backend named by `EMBEDDING_PROVIDER`.
pub fn create_embedder(
    embedding: &EmbeddingConfig,
    llm: &LlmConfig,
    ollama: &OllamaConfig,
) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match embedding.provider.as_str() {
        "openai" => {
            let api_key = llm
                .openai_api_key
                .as_ref()
                .ok_or_else(|| EmbeddingError::NotConfigured("OPENAI_API_KEY not set".into()))?;
            Ok(Arc::new(OpenAiEmbedder::new(
                api_key.clone(),
                embedding.model.clone(),
                llm.openai_base_url.clone(),
                embedding.dimensions,
            )))
        }
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(
            ollama.url.clone(),
            ollama.embedding_model.clone(),
            embedding.dimensions,
        ))),
        other => Err(EmbeddingError::NotConfigured(format!(
            "unknown embedding provider: '{}'",
            other
        ))),
    }
}
