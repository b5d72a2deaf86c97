use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::utils::{admit, identity_of, namespace_for};
use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub name: Option<String>,
    pub content: Option<String>,
}

pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<UploadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = identity_of(&addr);
    admit(&state, &identity, &state.policies.upload)?;

    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("document name is required".to_string()))?;
    let content = payload
        .content
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("document content is empty".to_string()))?;

    let namespace = namespace_for(&identity);
    let chunk_count = state.documents.ingest(name, content, &namespace).await?;

    Ok(Json(json!({
        "documentName": name,
        "chunkCount": chunk_count,
    })))
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = identity_of(&addr);
    admit(&state, &identity, &state.policies.upload)?;

    let namespace = namespace_for(&identity);
    let documents = state.documents.list(&namespace).await?;
    Ok(Json(json!({ "documents": documents })))
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = identity_of(&addr);
    admit(&state, &identity, &state.policies.upload)?;

    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("document name is required".to_string()));
    }

    let namespace = namespace_for(&identity);
    let deleted = state.documents.delete(name, &namespace).await?;
    Ok(Json(json!({ "deletedChunkCount": deleted })))
}
