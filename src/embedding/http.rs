//! OpenAI-compatible `/v1/embeddings` provider.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::provider::{EmbeddingMode, EmbeddingProvider, ProviderError};
use crate::index::EMBEDDING_DIM;

pub struct HttpEmbeddingProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpEmbeddingProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>, ProviderError> {
        let url = format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
            "input_type": mode.as_str(),
        });

        let mut request = self.client.post(url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ProviderError::Transient(format!("embedding request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = format!("embedding provider returned {status}: {text}");
            return if status.as_u16() == 429 || status.is_server_error() {
                Err(ProviderError::Transient(message))
            } else {
                Err(ProviderError::Permanent(message))
            };
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| ProviderError::Transient(format!("embedding response unreadable: {err}")))?;
        let vector = parse_single_embedding(&payload)?;

        if vector.len() != EMBEDDING_DIM {
            return Err(ProviderError::Permanent(format!(
                "embedding has dimension {}, expected {}",
                vector.len(),
                EMBEDDING_DIM
            )));
        }
        Ok(vector)
    }
}

fn parse_single_embedding(payload: &Value) -> Result<Vec<f32>, ProviderError> {
    let item = payload
        .get("data")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| {
            ProviderError::Permanent("embedding response missing data array".to_string())
        })?;

    let values = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
        ProviderError::Permanent("embedding response item missing embedding array".to_string())
    })?;

    let mut vector = Vec::with_capacity(values.len());
    for value in values {
        let Some(float_value) = value.as_f64() else {
            return Err(ProviderError::Permanent(
                "embedding contains non-numeric value".to_string(),
            ));
        };
        vector.push(float_value as f32);
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn unit_embedding() -> Vec<f64> {
        let mut v = vec![0.0; EMBEDDING_DIM];
        v[0] = 1.0;
        v
    }

    #[tokio::test]
    async fn sends_input_type_and_parses_vector() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/embeddings")
                    .json_body_partial(r#"{"input_type": "passage"}"#);
                then.status(200)
                    .json_body(json!({"data": [{"index": 0, "embedding": unit_embedding()}]}));
            })
            .await;

        let provider = HttpEmbeddingProvider::new(server.base_url(), None, "test-model");
        let vector = provider
            .embed("hello", EmbeddingMode::Passage)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(vector.len(), EMBEDDING_DIM);
        assert_eq!(vector[0], 1.0);
    }

    #[tokio::test]
    async fn rate_limit_status_is_transient() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/embeddings");
                then.status(429).body("quota exceeded");
            })
            .await;

        let provider = HttpEmbeddingProvider::new(server.base_url(), None, "test-model");
        let err = provider
            .embed("hello", EmbeddingMode::Query)
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn client_error_status_is_permanent() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/embeddings");
                then.status(401).body("bad key");
            })
            .await;

        let provider = HttpEmbeddingProvider::new(server.base_url(), None, "test-model");
        let err = provider
            .embed("hello", EmbeddingMode::Query)
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn wrong_dimension_is_permanent() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/embeddings");
                then.status(200)
                    .json_body(json!({"data": [{"index": 0, "embedding": [0.1, 0.2]}]}));
            })
            .await;

        let provider = HttpEmbeddingProvider::new(server.base_url(), None, "test-model");
        let err = provider
            .embed("hello", EmbeddingMode::Query)
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }
}
