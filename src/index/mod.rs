//! Vector index abstraction: a namespaced store of embedded chunks with
//! similarity search, bulk upsert, and id-based delete.
//!
//! Namespaces are the sole isolation boundary between callers; no operation
//! here ever crosses one. The index is eventually consistent and offers no
//! multi-key transactions.

pub mod remote;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

pub use remote::RemoteVectorIndex;
pub use sqlite::SqliteVectorIndex;

/// Embedding dimensionality, fixed system-wide. Every stored vector and
/// every query vector has exactly this length.
pub const EMBEDDING_DIM: usize = 768;

/// Metadata carried alongside each stored vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub document_name: String,
    pub text: String,
    pub ordinal: u32,
    /// ISO-8601 ingestion timestamp.
    pub uploaded_at: String,
}

/// The unit of storage in the index: one embedded chunk of one document.
/// All records sharing a `document_name` within a namespace collectively
/// represent one logical document.
#[derive(Debug, Clone)]
pub struct IndexRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// One ranked result of a similarity query.
#[derive(Debug, Clone)]
pub struct IndexMatch {
    pub id: String,
    pub score: f32,
    pub metadata: RecordMetadata,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexStats {
    pub total_records: u64,
}

/// Abstract client for the external vector index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Writes all records into the namespace's partition in one bulk call.
    async fn upsert(&self, namespace: &str, records: Vec<IndexRecord>) -> Result<(), ApiError>;

    /// Ranked nearest-neighbour search within a namespace, optionally
    /// restricted to records of one document by exact name match.
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        document_name: Option<&str>,
    ) -> Result<Vec<IndexMatch>, ApiError>;

    /// Deletes the given record ids from the namespace in one bulk call.
    async fn delete_by_ids(&self, namespace: &str, ids: &[String]) -> Result<(), ApiError>;

    async fn stats(&self) -> Result<IndexStats, ApiError>;

    /// Liveness probe; reports reachability rather than erroring.
    async fn health_check(&self) -> Result<bool, ApiError>;
}
