//! Embedding gateway: retry/backoff around a provider plus batched,
//! order-preserving parallel embedding.

pub mod http;
pub mod provider;

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::try_join_all;

use crate::core::errors::ApiError;

pub use http::HttpEmbeddingProvider;
pub use provider::{EmbeddingMode, EmbeddingProvider, ProviderError};

/// Attempt cap for transiently failing embedding calls.
const MAX_ATTEMPTS: u32 = 5;
/// First backoff delay; doubles after each transient failure.
const BACKOFF_BASE: Duration = Duration::from_secs(1);
/// How many embeddings are in flight at once inside `embed_batch`. Providers
/// impose coarse concurrency limits, so this stays small.
const DEFAULT_BATCH_WIDTH: usize = 5;

/// Wraps an [`EmbeddingProvider`] with the retry policy and the bounded
/// intra-batch parallelism every caller in the pipeline relies on.
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    batch_width: usize,
}

impl EmbeddingGateway {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            batch_width: DEFAULT_BATCH_WIDTH,
        }
    }

    pub fn with_batch_width(mut self, batch_width: usize) -> Self {
        self.batch_width = batch_width.max(1);
        self
    }

    /// Embeds one text, retrying transient provider failures up to
    /// [`MAX_ATTEMPTS`] times with exponential backoff (1s, 2s, 4s, ...).
    /// Permanent failures surface immediately; after exhaustion the last
    /// transient error surfaces.
    pub async fn embed_one(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>, ApiError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.provider.embed(text, mode).await {
                Ok(vector) => return Ok(vector),
                Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                    let delay = BACKOFF_BASE * 2u32.pow(attempt - 1);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transient embedding failure, backing off: {err}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(ProviderError::Transient(msg)) => {
                    tracing::error!(attempts = attempt, "embedding retries exhausted: {msg}");
                    return Err(ApiError::TransientProvider(msg));
                }
                Err(ProviderError::Permanent(msg)) => {
                    return Err(ApiError::PermanentProvider(msg));
                }
            }
        }
    }

    /// Embeds a sequence of texts, preserving input order.
    ///
    /// Texts are processed in windows of the batch width; each window is a
    /// join barrier, so a failure anywhere (after its own retries) fails the
    /// whole batch and nothing downstream consumes partial results.
    pub async fn embed_batch(
        &self,
        texts: &[String],
        mode: EmbeddingMode,
    ) -> Result<Vec<Vec<f32>>, ApiError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for window in texts.chunks(self.batch_width) {
            let embedded =
                try_join_all(window.iter().map(|text| self.embed_one(text, mode))).await?;
            vectors.extend(embedded);
        }
        Ok(vectors)
    }

    /// Minimal single-call liveness probe. Never errors, never retries.
    pub async fn health_check(&self) -> bool {
        match self.provider.embed("ping", EmbeddingMode::Query).await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!("embedding health check failed: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Provider that fails transiently a scripted number of times, then
    /// returns a vector encoding the input text's length.
    struct ScriptedProvider {
        transient_failures: u32,
        permanent: bool,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn transient(failures: u32) -> Self {
            Self {
                transient_failures: failures,
                permanent: false,
                calls: AtomicU32::new(0),
            }
        }

        fn permanent() -> Self {
            Self {
                transient_failures: 0,
                permanent: true,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for ScriptedProvider {
        async fn embed(&self, text: &str, _mode: EmbeddingMode) -> Result<Vec<f32>, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.permanent {
                return Err(ProviderError::Permanent("rejected".to_string()));
            }
            if call < self.transient_failures {
                return Err(ProviderError::Transient("quota".to_string()));
            }
            Ok(vec![text.chars().count() as f32])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures_with_backoff() {
        let provider = Arc::new(ScriptedProvider::transient(3));
        let gateway = EmbeddingGateway::new(provider.clone());

        let start = tokio::time::Instant::now();
        let vector = gateway.embed_one("abc", EmbeddingMode::Query).await.unwrap();

        assert_eq!(vector, vec![3.0]);
        assert_eq!(provider.calls(), 4);
        // Three delays: 1s + 2s + 4s.
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_exactly_five_attempts_then_surfaces_transient() {
        let provider = Arc::new(ScriptedProvider::transient(u32::MAX));
        let gateway = EmbeddingGateway::new(provider.clone());

        let start = tokio::time::Instant::now();
        let err = gateway
            .embed_one("abc", EmbeddingMode::Passage)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::TransientProvider(_)));
        assert_eq!(provider.calls(), 5);
        // Four delays between five attempts: 1s + 2s + 4s + 8s.
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_is_never_retried() {
        let provider = Arc::new(ScriptedProvider::permanent());
        let gateway = EmbeddingGateway::new(provider.clone());

        let start = tokio::time::Instant::now();
        let err = gateway
            .embed_one("abc", EmbeddingMode::Query)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::PermanentProvider(_)));
        assert_eq!(provider.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn batch_preserves_input_order_across_windows() {
        let provider = Arc::new(ScriptedProvider::transient(0));
        let gateway = EmbeddingGateway::new(provider).with_batch_width(2);

        let texts: Vec<String> = ["a", "bb", "ccc", "dddd", "eeeee"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let vectors = gateway
            .embed_batch(&texts, EmbeddingMode::Passage)
            .await
            .unwrap();

        let lengths: Vec<f32> = vectors.into_iter().map(|v| v[0]).collect();
        assert_eq!(lengths, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_fails_whole_when_one_item_exhausts_retries() {
        struct FailSecond {
            calls: AtomicU32,
        }

        #[async_trait::async_trait]
        impl EmbeddingProvider for FailSecond {
            async fn embed(
                &self,
                text: &str,
                _mode: EmbeddingMode,
            ) -> Result<Vec<f32>, ProviderError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if text == "bad" {
                    Err(ProviderError::Transient("quota".to_string()))
                } else {
                    Ok(vec![1.0])
                }
            }
        }

        let gateway = EmbeddingGateway::new(Arc::new(FailSecond {
            calls: AtomicU32::new(0),
        }));
        let texts = vec!["ok".to_string(), "bad".to_string()];
        let err = gateway
            .embed_batch(&texts, EmbeddingMode::Passage)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::TransientProvider(_)));
    }

    #[tokio::test]
    async fn health_check_reports_without_throwing() {
        let healthy = EmbeddingGateway::new(Arc::new(ScriptedProvider::transient(0)));
        assert!(healthy.health_check().await);

        let unhealthy = EmbeddingGateway::new(Arc::new(ScriptedProvider::permanent()));
        assert!(!unhealthy.health_check().await);
    }
}
