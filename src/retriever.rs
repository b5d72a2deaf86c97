//! Question-time retrieval: embed the question, search the caller's
//! namespace, and hand ranked sources to the answer generator.

use std::sync::Arc;

use serde::Serialize;

use crate::core::errors::ApiError;
use crate::embedding::{EmbeddingGateway, EmbeddingMode};
use crate::index::VectorIndex;

/// One retrieved chunk, best match first in the returned sequence.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedSource {
    pub document_name: String,
    pub chunk_text: String,
    pub score: f32,
}

pub struct Retriever {
    embeddings: Arc<EmbeddingGateway>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(embeddings: Arc<EmbeddingGateway>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embeddings, index }
    }

    /// Returns up to `top_k` sources for `question`, ranked best-first.
    /// Zero matches yield an empty sequence; how to phrase "no information"
    /// is the caller's decision.
    pub async fn retrieve(
        &self,
        question: &str,
        namespace: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedSource>, ApiError> {
        let vector = self
            .embeddings
            .embed_one(question, EmbeddingMode::Query)
            .await?;
        let matches = self.index.query(namespace, &vector, top_k, None).await?;

        Ok(matches
            .into_iter()
            .map(|m| RetrievedSource {
                document_name: m.metadata.document_name,
                chunk_text: m.metadata.text,
                score: m.score,
            })
            .collect())
    }
}
