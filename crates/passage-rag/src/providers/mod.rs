//! Provider abstractions for embeddings, generation, and their
//! configuration-driven factories
//!
//! Backends are resolved exactly once at construction; nothing
//! branches on backend strings inside the request path.

pub mod embedding;
pub mod gemini;
pub mod generator;
pub mod local;
pub mod openai;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ModelBackend, RagConfig, StoreBackend};
use crate::error::{Error, Result};
use crate::store::{MemoryVectorStore, PgVectorStore, VectorStore};

pub use embedding::{fill_degraded, EmbeddedBatch, EmbeddingProvider};
pub use gemini::{GeminiEmbedder, GeminiGenerator};
pub use generator::{AnswerGenerator, GenerationOptions};
pub use local::{ExtractiveGenerator, HashEmbedder};
pub use openai::{OpenAiEmbedder, OpenAiGenerator};

/// Build the embedding provider selected by the config
pub fn build_embedder(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.backend {
        ModelBackend::Local => Arc::new(HashEmbedder::new(&config.embeddings)),
        ModelBackend::Api => Arc::new(OpenAiEmbedder::new(config)?),
        ModelBackend::Gemini => Arc::new(GeminiEmbedder::new(config)?),
    };
    tracing::info!(provider = embedder.name(), "embedding provider ready");
    Ok(embedder)
}

/// Build the answer generator selected by the config
pub fn build_generator(config: &RagConfig) -> Result<Arc<dyn AnswerGenerator>> {
    let generator: Arc<dyn AnswerGenerator> = match config.backend {
        ModelBackend::Local => Arc::new(ExtractiveGenerator::new(&config.generation)),
        ModelBackend::Api => Arc::new(OpenAiGenerator::new(config)?),
        ModelBackend::Gemini => Arc::new(GeminiGenerator::new(config)?),
    };
    tracing::info!(provider = generator.name(), "answer generator ready");
    Ok(generator)
}

/// Build the vector store selected by the config.
///
/// Async because the pgvector backend connects during construction.
pub async fn build_store(config: &RagConfig) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match config.store_backend {
        StoreBackend::Memory => Arc::new(MemoryVectorStore::new(config.embeddings.dimensions)),
        StoreBackend::Pgvector => {
            let db = config
                .vector_db
                .as_ref()
                .ok_or_else(|| Error::config("pgvector store requires a [vector_db] section"))?;
            Arc::new(
                PgVectorStore::connect(
                    db,
                    config.embeddings.dimensions,
                    Duration::from_secs(config.remote.timeout_secs),
                )
                .await?,
            )
        }
    };
    tracing::info!(store = store.name(), "vector store ready");
    Ok(store)
}
