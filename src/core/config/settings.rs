use std::env;

/// Runtime settings, read from the environment once at startup.
///
/// The defaults assume a local OpenAI-compatible embedding and chat server
/// (e.g. llama-server); the remote vector index is used only when
/// `VECTOR_INDEX_URL` is set, otherwise the in-process SQLite backend serves
/// as the index.
#[derive(Debug, Clone)]
pub struct Settings {
    pub embedding_api_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub vector_index_url: Option<String>,
    pub vector_index_api_key: Option<String>,
    pub answer_api_url: String,
    pub answer_api_key: Option<String>,
    pub answer_model: String,
    pub upload_per_minute: u32,
    pub ask_per_minute: u32,
    pub health_per_minute: u32,
    pub top_k: usize,
}

impl Settings {
    pub fn from_env() -> Self {
        let embedding_api_url =
            env_string("EMBEDDING_API_URL", "http://127.0.0.1:8081");
        Settings {
            embedding_api_key: env_optional("EMBEDDING_API_KEY"),
            embedding_model: env_string("EMBEDDING_MODEL", "nomic-embed-text-v1.5"),
            vector_index_url: env_optional("VECTOR_INDEX_URL"),
            vector_index_api_key: env_optional("VECTOR_INDEX_API_KEY"),
            answer_api_url: env_string("ANSWER_API_URL", &embedding_api_url),
            answer_api_key: env_optional("ANSWER_API_KEY"),
            answer_model: env_string("ANSWER_MODEL", "gpt-4o-mini"),
            upload_per_minute: env_parse("RATE_UPLOAD_PER_MIN", 10),
            ask_per_minute: env_parse("RATE_ASK_PER_MIN", 20),
            health_per_minute: env_parse("RATE_HEALTH_PER_MIN", 60),
            top_k: env_parse("TOP_K", 4),
            embedding_api_url,
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
