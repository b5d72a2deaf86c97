use std::sync::Arc;

use thiserror::Error;

use crate::answer::{AnswerGenerator, HttpAnswerGenerator};
use crate::core::config::{AppPaths, Settings};
use crate::documents::DocumentStore;
use crate::embedding::{EmbeddingGateway, HttpEmbeddingProvider};
use crate::index::{RemoteVectorIndex, SqliteVectorIndex, VectorIndex};
use crate::ratelimit::{RateGovernor, RatePolicy};
use crate::retriever::Retriever;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("failed to open local vector index: {0}")]
    Index(String),
}

/// The three admission policies applied independently to each caller.
///
/// The upload policy covers the whole document lifecycle: uploads,
/// listings, and deletions all draw from the same budget, so a caller
/// bursting reads spends the budget it would otherwise use for writes.
#[derive(Debug, Clone)]
pub struct RatePolicies {
    pub upload: RatePolicy,
    pub ask: RatePolicy,
    pub health: RatePolicy,
}

/// Global application state shared across all routes.
pub struct AppState {
    pub settings: Settings,
    pub paths: Arc<AppPaths>,
    pub governor: RateGovernor,
    pub policies: RatePolicies,
    pub embeddings: Arc<EmbeddingGateway>,
    pub index: Arc<dyn VectorIndex>,
    pub documents: DocumentStore,
    pub retriever: Retriever,
    pub answerer: Arc<dyn AnswerGenerator>,
}

impl AppState {
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let settings = Settings::from_env();

        let policies = RatePolicies {
            upload: RatePolicy::per_minute("upload", settings.upload_per_minute),
            ask: RatePolicy::per_minute("ask", settings.ask_per_minute),
            health: RatePolicy::per_minute("health", settings.health_per_minute),
        };

        let embeddings = Arc::new(EmbeddingGateway::new(Arc::new(HttpEmbeddingProvider::new(
            settings.embedding_api_url.clone(),
            settings.embedding_api_key.clone(),
            settings.embedding_model.clone(),
        ))));

        let index: Arc<dyn VectorIndex> = match &settings.vector_index_url {
            Some(url) => Arc::new(RemoteVectorIndex::new(
                url.clone(),
                settings.vector_index_api_key.clone(),
            )),
            None => Arc::new(
                SqliteVectorIndex::with_path(paths.db_path.clone())
                    .await
                    .map_err(|e| InitializationError::Index(e.to_string()))?,
            ),
        };

        let documents = DocumentStore::new(embeddings.clone(), index.clone());
        let retriever = Retriever::new(embeddings.clone(), index.clone());
        let answerer = Arc::new(HttpAnswerGenerator::new(
            settings.answer_api_url.clone(),
            settings.answer_api_key.clone(),
            settings.answer_model.clone(),
        ));

        Ok(Arc::new(AppState {
            settings,
            paths,
            governor: RateGovernor::new(),
            policies,
            embeddings,
            index,
            documents,
            retriever,
            answerer,
        }))
    }
}
