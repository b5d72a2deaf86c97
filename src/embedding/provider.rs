use async_trait::async_trait;
use thiserror::Error;

/// Whether a text is embedded as a question or as document content. Some
/// providers use asymmetric embeddings and need the distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingMode {
    Query,
    Passage,
}

impl EmbeddingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingMode::Query => "query",
            EmbeddingMode::Passage => "passage",
        }
    }
}

/// Failure classes a provider must distinguish: quota/server trouble is
/// worth retrying, a rejected request is not.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transient embedding failure: {0}")]
    Transient(String),
    #[error("permanent embedding failure: {0}")]
    Permanent(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// A single-text embedding call against an external provider.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>, ProviderError>;
}
