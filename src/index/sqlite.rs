//! In-process SQLite vector index.
//!
//! Serves as the index backend for local runs and tests: vectors live as
//! little-endian f32 blobs and similarity search is brute-force cosine over
//! the namespace's rows. Adequate for single-process deployments; larger
//! installations point `VECTOR_INDEX_URL` at a real vector database instead.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::{IndexMatch, IndexRecord, IndexStats, RecordMetadata, VectorIndex};
use crate::core::errors::ApiError;

pub struct SqliteVectorIndex {
    pool: SqlitePool,
}

impl SqliteVectorIndex {
    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let index = Self { pool };
        index.init_schema().await?;
        Ok(index)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_records (
                namespace TEXT NOT NULL,
                id TEXT NOT NULL,
                document_name TEXT NOT NULL,
                ordinal INTEGER NOT NULL,
                text TEXT NOT NULL,
                uploaded_at TEXT NOT NULL,
                embedding BLOB NOT NULL,
                PRIMARY KEY (namespace, id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_records_document
             ON index_records(namespace, document_name)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_match(row: &sqlx::sqlite::SqliteRow, score: f32) -> IndexMatch {
        IndexMatch {
            id: row.get("id"),
            score,
            metadata: RecordMetadata {
                document_name: row.get("document_name"),
                text: row.get("text"),
                ordinal: row.get::<i64, _>("ordinal") as u32,
                uploaded_at: row.get("uploaded_at"),
            },
        }
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(&self, namespace: &str, records: Vec<IndexRecord>) -> Result<(), ApiError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        for record in &records {
            let blob = Self::serialize_embedding(&record.vector);
            sqlx::query(
                "INSERT OR REPLACE INTO index_records
                 (namespace, id, document_name, ordinal, text, uploaded_at, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(namespace)
            .bind(&record.id)
            .bind(&record.metadata.document_name)
            .bind(record.metadata.ordinal as i64)
            .bind(&record.metadata.text)
            .bind(&record.metadata.uploaded_at)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        document_name: Option<&str>,
    ) -> Result<Vec<IndexMatch>, ApiError> {
        let rows = if let Some(name) = document_name {
            sqlx::query(
                "SELECT id, document_name, ordinal, text, uploaded_at, embedding
                 FROM index_records
                 WHERE namespace = ?1 AND document_name = ?2",
            )
            .bind(namespace)
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?
        } else {
            sqlx::query(
                "SELECT id, document_name, ordinal, text, uploaded_at, embedding
                 FROM index_records
                 WHERE namespace = ?1",
            )
            .bind(namespace)
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?
        };

        let mut matches: Vec<IndexMatch> = rows
            .iter()
            .map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(vector, &stored);
                Self::row_to_match(row, score)
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete_by_ids(&self, namespace: &str, ids: &[String]) -> Result<(), ApiError> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        for id in ids {
            sqlx::query("DELETE FROM index_records WHERE namespace = ?1 AND id = ?2")
                .bind(namespace)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(ApiError::internal)?;
        }
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM index_records")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(IndexStats {
            total_records: count as u64,
        })
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(sqlx::query("SELECT 1").execute(&self.pool).await.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_index() -> (SqliteVectorIndex, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let index = SqliteVectorIndex::with_path(dir.path().join("index.db"))
            .await
            .unwrap();
        (index, dir)
    }

    fn record(id: &str, name: &str, ordinal: u32, vector: Vec<f32>) -> IndexRecord {
        IndexRecord {
            id: id.to_string(),
            vector,
            metadata: RecordMetadata {
                document_name: name.to_string(),
                text: format!("chunk {ordinal} of {name}"),
                ordinal,
                uploaded_at: "2026-01-01T00:00:00.000Z".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn upsert_and_query_ranks_by_cosine() {
        let (index, _dir) = test_index().await;

        index
            .upsert(
                "ns-a",
                vec![
                    record("d-1-0", "d", 0, vec![1.0, 0.0, 0.0]),
                    record("d-1-1", "d", 1, vec![0.0, 1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let matches = index.query("ns-a", &[0.9, 0.1, 0.0], 2, None).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "d-1-0");
        assert!(matches[0].score > matches[1].score);
    }

    #[tokio::test]
    async fn query_filters_by_document_name() {
        let (index, _dir) = test_index().await;

        index
            .upsert(
                "ns-a",
                vec![
                    record("a-1-0", "alpha", 0, vec![1.0, 0.0]),
                    record("b-1-0", "beta", 0, vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let matches = index
            .query("ns-a", &[1.0, 0.0], 10, Some("alpha"))
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].metadata.document_name, "alpha");
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let (index, _dir) = test_index().await;

        index
            .upsert("ns-a", vec![record("a-1-0", "alpha", 0, vec![1.0])])
            .await
            .unwrap();

        let other = index.query("ns-b", &[1.0], 10, None).await.unwrap();
        assert!(other.is_empty());

        index
            .delete_by_ids("ns-b", &["a-1-0".to_string()])
            .await
            .unwrap();
        let still_there = index.query("ns-a", &[1.0], 10, None).await.unwrap();
        assert_eq!(still_there.len(), 1);
    }

    #[tokio::test]
    async fn delete_by_ids_removes_only_those_records() {
        let (index, _dir) = test_index().await;

        index
            .upsert(
                "ns-a",
                vec![
                    record("a-1-0", "alpha", 0, vec![1.0]),
                    record("a-1-1", "alpha", 1, vec![1.0]),
                    record("b-1-0", "beta", 0, vec![1.0]),
                ],
            )
            .await
            .unwrap();

        index
            .delete_by_ids("ns-a", &["a-1-0".to_string(), "a-1-1".to_string()])
            .await
            .unwrap();

        let remaining = index.query("ns-a", &[1.0], 10, None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].metadata.document_name, "beta");
        assert_eq!(index.stats().await.unwrap().total_records, 1);
    }

    #[tokio::test]
    async fn upsert_replaces_records_with_the_same_id() {
        let (index, _dir) = test_index().await;

        index
            .upsert("ns-a", vec![record("a-1-0", "alpha", 0, vec![1.0, 0.0])])
            .await
            .unwrap();
        index
            .upsert("ns-a", vec![record("a-1-0", "alpha", 0, vec![0.0, 1.0])])
            .await
            .unwrap();

        assert_eq!(index.stats().await.unwrap().total_records, 1);
        let matches = index.query("ns-a", &[0.0, 1.0], 1, None).await.unwrap();
        assert!(matches[0].score > 0.99);
    }
}
