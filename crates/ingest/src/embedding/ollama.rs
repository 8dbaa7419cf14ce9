use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{check_vectors, post_json};
use super::traits::{Embedder, EmbeddingError};

/// Batch `/api/embed` on a local Ollama server.
pub struct OllamaEmbedder {
    client: Client,
    url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    pub fn new(url: String, model: String, dimensions: usize) -> Self {
        Self {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            model,
            dimensions,
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    /// Inputs longer than the model context are cut instead of rejected.
    truncate: bool,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(model = %self.model, texts = texts.len(), "ollama embeddings");

        let body = EmbedRequest {
            model: &self.model,
            input: texts,
            truncate: true,
        };
        let response: EmbedResponse =
            post_json(self.client.post(format!("{}/api/embed", self.url)), &body).await?;

        check_vectors(&response.embeddings, texts.len(), self.dimensions)?;
        Ok(response.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
