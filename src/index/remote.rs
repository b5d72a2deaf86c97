//! HTTP client for a remote namespaced vector index (Pinecone-style REST
//! API: `/vectors/upsert`, `/query`, `/vectors/delete`,
//! `/describe_index_stats`).

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};

use super::{IndexMatch, IndexRecord, IndexStats, RecordMetadata, VectorIndex};
use crate::core::errors::ApiError;

pub struct RemoteVectorIndex {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteVectorIndex {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let mut request = self.client.post(self.endpoint(path)).json(body);
        if let Some(key) = &self.api_key {
            request = request.header("Api-Key", key);
        }

        let response = request.send().await.map_err(|err| {
            ApiError::TransientProvider(format!("vector index unreachable: {err}"))
        })?;
        let response = check_status(response).await?;
        response.json().await.map_err(|err| {
            ApiError::TransientProvider(format!("vector index response unreadable: {err}"))
        })
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("vector index returned {status}: {body}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Err(ApiError::TransientProvider(message))
    } else {
        Err(ApiError::PermanentProvider(message))
    }
}

fn match_from_value(value: &Value) -> Option<IndexMatch> {
    let metadata = value.get("metadata")?;
    Some(IndexMatch {
        id: value.get("id")?.as_str()?.to_string(),
        score: value.get("score").and_then(Value::as_f64).unwrap_or(0.0) as f32,
        metadata: RecordMetadata {
            document_name: metadata
                .get("documentName")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            text: metadata
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            ordinal: metadata
                .get("ordinal")
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32,
            uploaded_at: metadata
                .get("uploadedAt")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
    })
}

#[async_trait]
impl VectorIndex for RemoteVectorIndex {
    async fn upsert(&self, namespace: &str, records: Vec<IndexRecord>) -> Result<(), ApiError> {
        if records.is_empty() {
            return Ok(());
        }

        let vectors: Vec<Value> = records
            .iter()
            .map(|record| {
                json!({
                    "id": record.id,
                    "values": record.vector,
                    "metadata": {
                        "documentName": record.metadata.document_name,
                        "text": record.metadata.text,
                        "ordinal": record.metadata.ordinal,
                        "uploadedAt": record.metadata.uploaded_at,
                    },
                })
            })
            .collect();

        self.post(
            "/vectors/upsert",
            &json!({ "vectors": vectors, "namespace": namespace }),
        )
        .await?;
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        document_name: Option<&str>,
    ) -> Result<Vec<IndexMatch>, ApiError> {
        let mut body = json!({
            "vector": vector,
            "topK": top_k,
            "namespace": namespace,
            "includeMetadata": true,
        });
        if let Some(name) = document_name {
            body["filter"] = json!({ "documentName": { "$eq": name } });
        }

        let payload = self.post("/query", &body).await?;
        let matches = payload
            .get("matches")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(match_from_value).collect())
            .unwrap_or_default();
        Ok(matches)
    }

    async fn delete_by_ids(&self, namespace: &str, ids: &[String]) -> Result<(), ApiError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.post(
            "/vectors/delete",
            &json!({ "ids": ids, "namespace": namespace }),
        )
        .await?;
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats, ApiError> {
        let payload = self.post("/describe_index_stats", &json!({})).await?;
        let total_records = payload
            .get("totalVectorCount")
            .or_else(|| payload.get("totalRecordCount"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        Ok(IndexStats { total_records })
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(self.stats().await.is_ok())
    }
}
