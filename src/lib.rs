//! Document Q&A backend: upload documents, ask questions answered from
//! them.
//!
//! ```text
//! upload ──► RateGovernor ──► chunker ──► EmbeddingGateway ──► VectorIndex
//! ask    ──► RateGovernor ──► EmbeddingGateway ──► VectorIndex ──► AnswerGenerator
//! ```
//!
//! The core is the ingestion and retrieval orchestration: chunking,
//! resilient embedding invocation, per-caller rate admission, and document
//! lifecycle against a namespaced vector index. Rendering and transcript
//! storage are the client's concern.

pub mod answer;
pub mod chunker;
pub mod core;
pub mod documents;
pub mod embedding;
pub mod index;
pub mod ratelimit;
pub mod retriever;
pub mod server;
pub mod state;
