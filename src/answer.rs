//! Grounded answer generation against an OpenAI-compatible chat endpoint.
//!
//! The pipeline hands over a question plus ranked sources and expects back
//! free-text prose; citation presentation stays with the UI layer.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::retriever::RetrievedSource;

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(
        &self,
        question: &str,
        sources: &[RetrievedSource],
    ) -> Result<String, ApiError>;
}

pub struct HttpAnswerGenerator {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpAnswerGenerator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        }
    }
}

#[async_trait]
impl AnswerGenerator for HttpAnswerGenerator {
    async fn generate(
        &self,
        question: &str,
        sources: &[RetrievedSource],
    ) -> Result<String, ApiError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": build_system_prompt(sources) },
                { "role": "user", "content": question },
            ],
            "stream": false,
        });

        let mut request = self.client.post(url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|err| {
            ApiError::TransientProvider(format!("answer generation request failed: {err}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = format!("answer generator returned {status}: {text}");
            return if status.as_u16() == 429 || status.is_server_error() {
                Err(ApiError::TransientProvider(message))
            } else {
                Err(ApiError::PermanentProvider(message))
            };
        }

        let payload: Value = response.json().await.map_err(ApiError::internal)?;
        extract_answer(&payload).ok_or_else(|| {
            ApiError::Internal("answer generator response missing content".to_string())
        })
    }
}

fn build_system_prompt(sources: &[RetrievedSource]) -> String {
    let mut prompt = String::from(
        "Answer the user's question using only the document excerpts below. \
         If the excerpts do not contain the answer, say so.\n",
    );
    for (i, source) in sources.iter().enumerate() {
        prompt.push_str(&format!(
            "\n[{}] (from \"{}\")\n{}\n",
            i + 1,
            source.document_name,
            source.chunk_text
        ));
    }
    prompt
}

fn extract_answer(payload: &Value) -> Option<String> {
    let choice = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())?;
    choice
        .get("message")
        .and_then(|msg| msg.get("content"))
        .and_then(Value::as_str)
        .or_else(|| choice.get("text").and_then(Value::as_str))
        .map(|s| s.to_string())
}
