use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use super::utils::{admit, identity_of};
use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = identity_of(&addr);
    admit(&state, &identity, &state.policies.health)?;

    let embedding_reachable = state.embeddings.health_check().await;
    let index_reachable = state.index.health_check().await.unwrap_or(false);

    Ok(Json(json!({
        "embeddingReachable": embedding_reachable,
        "indexReachable": index_reachable,
    })))
}
