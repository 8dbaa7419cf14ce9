use serde::de::DeserializeOwned;
use serde::Serialize;

use super::traits::EmbeddingError;

/// POST a JSON body and decode the reply; non-2xx statuses become `Api`.
pub(crate) async fn post_json<B, R>(
    request: reqwest::RequestBuilder,
    body: &B,
) -> Result<R, EmbeddingError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = request.json(body).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(EmbeddingError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

/// One vector per input, every vector `dimensions` long.
pub(crate) fn check_vectors(
    vectors: &[Vec<f32>],
    expected_count: usize,
    dimensions: usize,
) -> Result<(), EmbeddingError> {
    if vectors.len() != expected_count {
        return Err(EmbeddingError::CountMismatch {
            expected: expected_count,
            actual: vectors.len(),
        });
    }
    match vectors.iter().find(|v| v.len() != dimensions) {
        Some(bad) => Err(EmbeddingError::DimensionMismatch {
            expected: dimensions,
            actual: bad.len(),
        }),
        None => Ok(()),
    }
}
