use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Every failure a request can surface, mapped onto an HTTP status at the
/// boundary. Provider errors are never swallowed below this layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller-fixable input problem; retrying unchanged will not help.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Admission denied; the caller should retry after the reported delay.
    #[error("rate limited, retry in {retry_after_ms} ms")]
    RateLimited { retry_after_ms: u64 },
    /// Rate-limit or server-side failure from a provider, surfaced after the
    /// internal retry budget is exhausted.
    #[error("transient provider error: {0}")]
    TransientProvider(String),
    /// Non-retryable provider rejection (bad request, auth failure).
    #[error("permanent provider error: {0}")]
    PermanentProvider(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::RateLimited { retry_after_ms } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("rate limit exceeded, retry in {} ms", retry_after_ms),
            ),
            ApiError::TransientProvider(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::PermanentProvider(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();
        if let ApiError::RateLimited { retry_after_ms } = self {
            let retry_after_secs = retry_after_ms.div_ceil(1000);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_response_carries_retry_after() {
        let response = ApiError::RateLimited {
            retry_after_ms: 1500,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER),
            Some(&HeaderValue::from(2u64))
        );
    }

    #[test]
    fn status_mapping_covers_the_taxonomy() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                ApiError::TransientProvider("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::PermanentProvider("x".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                ApiError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
