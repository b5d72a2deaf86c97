//! Document lifecycle orchestration: ingest, list, and delete whole
//! documents, each stored as N embedded chunks in the vector index.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::chunker;
use crate::core::errors::ApiError;
use crate::embedding::{EmbeddingGateway, EmbeddingMode};
use crate::index::{IndexRecord, RecordMetadata, VectorIndex, EMBEDDING_DIM};

/// Maximum chunk length in characters, chosen to stay safely under the
/// embedding provider's input-token ceiling.
pub const MAX_CHUNK_LEN: usize = 2000;

/// Sampling limit for the listing/delete queries. The index is not a primary
/// database, so listing is reconstructed from a broad query capped here.
const SAMPLE_LIMIT: usize = 1000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub name: String,
    pub uploaded_at: String,
    pub chunk_count: usize,
}

pub struct DocumentStore {
    embeddings: Arc<EmbeddingGateway>,
    index: Arc<dyn VectorIndex>,
}

impl DocumentStore {
    pub fn new(embeddings: Arc<EmbeddingGateway>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embeddings, index }
    }

    /// Chunks, embeds, and indexes one document under `namespace`.
    ///
    /// Every chunk is embedded before anything is written, so a late
    /// embedding failure can never leave half a document indexed. Record ids
    /// include the ingestion epoch millis, so re-uploading the same name
    /// later coexists with (rather than corrupts) the earlier version.
    pub async fn ingest(
        &self,
        document_name: &str,
        raw_text: &str,
        namespace: &str,
    ) -> Result<usize, ApiError> {
        if raw_text.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "document content is empty".to_string(),
            ));
        }

        let chunks = chunker::chunk(raw_text, MAX_CHUNK_LEN);
        let vectors = self
            .embeddings
            .embed_batch(&chunks, EmbeddingMode::Passage)
            .await?;

        let uploaded = Utc::now();
        let epoch_ms = uploaded.timestamp_millis();
        let uploaded_at = uploaded.to_rfc3339_opts(SecondsFormat::Millis, true);

        let records: Vec<IndexRecord> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(ordinal, (text, vector))| IndexRecord {
                id: format!("{document_name}-{epoch_ms}-{ordinal}"),
                vector,
                metadata: RecordMetadata {
                    document_name: document_name.to_string(),
                    text,
                    ordinal: ordinal as u32,
                    uploaded_at: uploaded_at.clone(),
                },
            })
            .collect();

        let chunk_count = records.len();
        self.index.upsert(namespace, records).await?;

        tracing::info!(
            document = document_name,
            namespace,
            chunk_count,
            "document ingested"
        );
        Ok(chunk_count)
    }

    /// Lists the namespace's documents by sampling the index and aggregating
    /// by document name (first-seen upload time, counted records).
    ///
    /// Known approximation: a namespace holding more records than the
    /// sampling limit may undercount chunks or omit low-relevance documents
    /// entirely. Exact listing would need an authoritative document catalog,
    /// which this service deliberately does not keep.
    pub async fn list(&self, namespace: &str) -> Result<Vec<DocumentSummary>, ApiError> {
        let probe = probe_vector();
        let matches = self
            .index
            .query(namespace, &probe, SAMPLE_LIMIT, None)
            .await?;

        let mut summaries: Vec<DocumentSummary> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for m in matches {
            match by_name.get(&m.metadata.document_name) {
                Some(&idx) => summaries[idx].chunk_count += 1,
                None => {
                    by_name.insert(m.metadata.document_name.clone(), summaries.len());
                    summaries.push(DocumentSummary {
                        name: m.metadata.document_name,
                        uploaded_at: m.metadata.uploaded_at,
                        chunk_count: 1,
                    });
                }
            }
        }
        Ok(summaries)
    }

    /// Deletes every record of `document_name` within the namespace.
    ///
    /// The filtered query returns at most one sampling-limit batch of ids,
    /// so collection re-queries after each bulk delete until the filter
    /// matches nothing; documents larger than one batch are still removed
    /// completely.
    ///
    /// Not transactional with a concurrent ingest of the same name: such a
    /// race may remove only part of the newly written records. The index
    /// offers no multi-key transactions, so this limitation is inherent.
    pub async fn delete(&self, document_name: &str, namespace: &str) -> Result<usize, ApiError> {
        let probe = probe_vector();
        let mut deleted = 0usize;
        loop {
            let matches = self
                .index
                .query(namespace, &probe, SAMPLE_LIMIT, Some(document_name))
                .await?;
            if matches.is_empty() {
                break;
            }

            let ids: Vec<String> = matches.into_iter().map(|m| m.id).collect();
            deleted += ids.len();
            self.index.delete_by_ids(namespace, &ids).await?;
        }

        if deleted == 0 {
            return Err(ApiError::NotFound(format!(
                "document '{document_name}' not found"
            )));
        }

        tracing::info!(
            document = document_name,
            namespace,
            deleted,
            "document deleted"
        );
        Ok(deleted)
    }
}

/// Probe vector for the broad sampling queries. The first component is set
/// because cosine-metric indexes reject an all-zero query vector.
fn probe_vector() -> Vec<f32> {
    let mut probe = vec![0.0f32; EMBEDDING_DIM];
    probe[0] = 1.0;
    probe
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_probe_is_a_nonzero_vector_of_index_dimension() {
        let probe = probe_vector();
        assert_eq!(probe.len(), EMBEDDING_DIM);
        assert!(probe.iter().any(|v| *v != 0.0));
    }
}
