use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{check_vectors, post_json};
use super::traits::{Embedder, EmbeddingError};

/// `/v1/embeddings` on OpenAI or a compatible server.
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, model: String, base_url: Option<String>, dimensions: usize) -> Self {
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com".to_string());
        Self {
            client: Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            dimensions,
        }
    }

    /// Only the `text-embedding-3` family accepts a requested dimensionality.
    fn requested_dimensions(&self) -> Option<usize> {
        self.model
            .starts_with("text-embedding-3")
            .then_some(self.dimensions)
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    encoding_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// Place each item at its `index`; items may arrive in any order.
fn into_input_order(items: Vec<EmbeddingItem>, count: usize) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; count];
    for item in items {
        if let Some(slot) = slots.get_mut(item.index) {
            *slot = Some(item.embedding);
        }
    }
    let vectors: Vec<Vec<f32>> = slots.into_iter().flatten().collect();
    if vectors.len() != count {
        return Err(EmbeddingError::CountMismatch {
            expected: count,
            actual: vectors.len(),
        });
    }
    Ok(vectors)
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(model = %self.model, texts = texts.len(), "openai embeddings");

        let request = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key);
        let body = EmbeddingsRequest {
            model: &self.model,
            input: texts,
            encoding_format: "float",
            dimensions: self.requested_dimensions(),
        };
        let response: EmbeddingsResponse = post_json(request, &body).await?;

        let vectors = into_input_order(response.data, texts.len())?;
        check_vectors(&vectors, texts.len(), self.dimensions)?;
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
