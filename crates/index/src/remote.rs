//! HTTP client for a hosted, namespaced vector index (Pinecone-style data
//! plane: `/vectors/upsert`, `/vectors/delete`, `/query`,
//! `/describe_index_stats`).

use async_trait::async_trait;
use ragtune_core::RetryPolicy;
use serde_json::{json, Value};
use tracing::debug;

use crate::{IndexEntry, IndexError, SearchHit, VectorIndex};

/// Vectors per upsert request.
const UPSERT_BATCH: usize = 100;

pub struct RemoteIndex {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    policy: RetryPolicy,
}

impl RemoteIndex {
    pub fn new(base_url: String, api_key: Option<String>, policy: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            policy,
        }
    }

    async fn post_once(&self, path: &str, body: &Value) -> Result<Value, IndexError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.header("Api-Key", key);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Api { status, body });
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| IndexError::Parse(e.to_string()))
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, IndexError> {
        debug!(path, "index request");
        self.policy
            .run(path, || self.post_once(path, &body))
            .await
    }
}

#[async_trait]
impl VectorIndex for RemoteIndex {
    async fn replace(&self, namespace: &str, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        self.delete(namespace).await?;

        for batch in entries.chunks(UPSERT_BATCH) {
            let vectors: Vec<Value> = batch
                .iter()
                .map(|e| {
                    json!({
                        "id": e.id,
                        "values": e.vector,
                        "metadata": {
                            "source": e.source,
                            "chunk_index": e.chunk_index,
                            "text": e.content,
                        },
                    })
                })
                .collect();
            self.post(
                "/vectors/upsert",
                json!({ "vectors": vectors, "namespace": namespace }),
            )
            .await?;
        }
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, IndexError> {
        let resp = self
            .post(
                "/query",
                json!({
                    "namespace": namespace,
                    "vector": vector,
                    "topK": top_k,
                    "includeMetadata": true,
                }),
            )
            .await?;
        parse_matches(&resp)
    }

    async fn count(&self, namespace: &str) -> Result<usize, IndexError> {
        let resp = self.post("/describe_index_stats", json!({})).await?;
        Ok(resp["namespaces"][namespace]["vectorCount"]
            .as_u64()
            .unwrap_or(0) as usize)
    }

    async fn delete(&self, namespace: &str) -> Result<(), IndexError> {
        match self
            .post(
                "/vectors/delete",
                json!({ "deleteAll": true, "namespace": namespace }),
            )
            .await
        {
            Ok(_) => Ok(()),
            // The namespace was never written.
            Err(IndexError::Api { status: 404, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn parse_matches(resp: &Value) -> Result<Vec<SearchHit>, IndexError> {
    let Some(matches) = resp["matches"].as_array() else {
        return Err(IndexError::Parse("missing matches".into()));
    };
    matches
        .iter()
        .map(|m| {
            let id = m["id"]
                .as_str()
                .ok_or_else(|| IndexError::Parse("match without id".into()))?;
            let content = m["metadata"]["text"]
                .as_str()
                .ok_or_else(|| IndexError::Parse(format!("match {id} without metadata.text")))?;
            Ok(SearchHit {
                id: id.to_string(),
                source: m["metadata"]["source"].as_str().unwrap_or_default().to_string(),
                chunk_index: m["metadata"]["chunk_index"].as_u64().unwrap_or(0) as usize,
                content: content.to_string(),
                similarity: m["score"].as_f64().unwrap_or(0.0) as f32,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_matches() {
        let resp = json!({
            "matches": [
                {"id": "c1", "score": 0.92, "metadata": {"text": "Refunds take 14 days.", "source": "faq.md", "chunk_index": 3}},
                {"id": "c2", "score": 0.55, "metadata": {"text": "Shipping is free."}}
            ],
            "namespace": "ns"
        });
        let hits = parse_matches(&resp).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "Refunds take 14 days.");
        assert_eq!(hits[0].chunk_index, 3);
        assert_eq!(hits[1].source, "");
        assert!((hits[0].similarity - 0.92).abs() < 1e-6);
    }

    #[test]
    fn match_without_text_is_a_parse_error() {
        let resp = json!({ "matches": [{ "id": "c1", "score": 0.1 }] });
        assert!(matches!(parse_matches(&resp), Err(IndexError::Parse(_))));
        assert!(matches!(parse_matches(&json!({})), Err(IndexError::Parse(_))));
    }
}
