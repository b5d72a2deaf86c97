use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::utils::{admit, identity_of, namespace_for};
use crate::core::errors::ApiError;
use crate::state::AppState;

/// Questions longer than this are rejected at the boundary.
const MAX_QUESTION_LEN: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: Option<String>,
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<AskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = identity_of(&addr);
    admit(&state, &identity, &state.policies.ask)?;

    let question = payload
        .question
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("question is required".to_string()))?;
    if question.chars().count() > MAX_QUESTION_LEN {
        return Err(ApiError::BadRequest(format!(
            "question exceeds {MAX_QUESTION_LEN} characters"
        )));
    }

    let namespace = namespace_for(&identity);
    let sources = state
        .retriever
        .retrieve(question, &namespace, state.settings.top_k)
        .await?;

    let answer = if sources.is_empty() {
        "I could not find anything in your documents about that.".to_string()
    } else {
        state.answerer.generate(question, &sources).await?
    };

    Ok(Json(json!({
        "answer": answer,
        "sources": sources,
    })))
}
