//! Configuration for the RAG engine
//!
//! Every component receives its section of this immutable tree at
//! construction time; nothing reads environment or global state.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main RAG engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Model backend for embeddings and generation
    #[serde(default)]
    pub backend: ModelBackend,
    /// Vector store backend
    #[serde(default)]
    pub store_backend: StoreBackend,
    /// OpenAI-compatible API credentials (required when backend = api)
    #[serde(default)]
    pub api: ApiBackendConfig,
    /// Gemini API credentials (required when backend = gemini)
    #[serde(default)]
    pub gemini: GeminiBackendConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Chunking policy
    #[serde(default)]
    pub chunking: ChunkPolicy,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Remote HTTP behavior (timeouts, retries, ingestion concurrency)
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Vector database configuration (required when store_backend = pgvector)
    #[serde(default)]
    pub vector_db: Option<VectorDbConfig>,
}

impl RagConfig {
    /// Check that backend-specific required fields are present.
    ///
    /// Callers are expected to run this once before constructing
    /// components; constructors assume a validated config.
    pub fn validate(&self) -> Result<()> {
        match self.backend {
            ModelBackend::Local => {}
            ModelBackend::Api => {
                if self.api.api_key.trim().is_empty() {
                    return Err(Error::config("api backend requires api.api_key"));
                }
            }
            ModelBackend::Gemini => {
                if self.gemini.api_key.trim().is_empty() {
                    return Err(Error::config("gemini backend requires gemini.api_key"));
                }
            }
        }

        if self.store_backend == StoreBackend::Pgvector && self.vector_db.is_none() {
            return Err(Error::config("pgvector store requires a [vector_db] section"));
        }

        if self.chunking.sentences_per_chunk == 0 {
            return Err(Error::config("chunking.sentences_per_chunk must be at least 1"));
        }

        if self.chunking.overlap_sentences >= self.chunking.sentences_per_chunk {
            return Err(Error::config(
                "chunking.overlap_sentences must be smaller than sentences_per_chunk",
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(Error::config("retrieval.top_k must be at least 1"));
        }

        if self.embeddings.dimensions == 0 {
            return Err(Error::config("embeddings.dimensions must be at least 1"));
        }

        Ok(())
    }
}

/// Model backend selection for embeddings and generation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Local CPU-bound providers (hashed embeddings, extractive answers)
    #[default]
    Local,
    /// OpenAI-compatible HTTP API
    Api,
    /// Google Generative Language API
    Gemini,
}

/// Vector store backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-memory flat index with full-scan cosine search
    #[default]
    Memory,
    /// Postgres with the pgvector extension
    Pgvector,
}

/// OpenAI-compatible API credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiBackendConfig {
    /// API key (bearer token)
    pub api_key: String,
    /// Base URL of the API
    pub base_url: String,
}

impl Default for ApiBackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

/// Gemini API credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiBackendConfig {
    /// API key passed as a query parameter
    pub api_key: String,
    /// Base URL of the Generative Language API
    pub base_url: String,
}

impl Default for GeminiBackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding dimensions (must match the selected backend's model)
    pub dimensions: usize,
    /// Maximum texts per backend request
    pub batch_size: usize,
    /// API model identifier (api backend)
    pub api_model: String,
    /// Gemini model identifier (gemini backend)
    pub gemini_model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: 768,
            batch_size: 100,
            api_model: "text-embedding-3-small".to_string(),
            gemini_model: "models/embedding-001".to_string(),
        }
    }
}

/// Sentence-window chunking policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPolicy {
    /// Sentences per chunk window
    pub sentences_per_chunk: usize,
    /// Sentences shared between consecutive windows
    pub overlap_sentences: usize,
    /// Split chunks above this token count at a sentence boundary
    pub max_tokens: usize,
    /// Merge chunks below this token count into the previous chunk
    pub min_tokens: usize,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            sentences_per_chunk: 10,
            overlap_sentences: 2,
            max_tokens: 384,
            min_tokens: 30,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum results returned to the caller
    pub top_k: usize,
    /// Drop results scoring below this (cosine similarity, -1.0..=1.0)
    pub similarity_threshold: Option<f32>,
    /// Token budget for the assembled context
    pub context_budget: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: Some(0.3),
            context_budget: 1024,
        }
    }
}

/// Generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// API model identifier (api backend)
    pub api_model: String,
    /// Gemini model identifier (gemini backend)
    pub gemini_model: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 512,
            api_model: "gpt-4-turbo-preview".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
        }
    }
}

/// Remote call behavior shared by all HTTP backends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Concurrent embedding sub-batches during offline ingestion
    pub parallel_batches: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_retries: 2,
            parallel_batches: 4,
        }
    }
}

/// Vector database configuration (pgvector backend)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// Postgres connection string
    pub connection_string: String,
    /// Table holding chunk vectors
    pub table_name: String,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            connection_string: "postgres://localhost/passage".to_string(),
            table_name: "chunks".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        RagConfig::default().validate().unwrap();
    }

    #[test]
    fn api_backend_requires_key() {
        let config = RagConfig {
            backend: ModelBackend::Api,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn pgvector_requires_db_section() {
        let config = RagConfig {
            store_backend: StoreBackend::Pgvector,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn overlap_must_be_smaller_than_window() {
        let config = RagConfig {
            chunking: ChunkPolicy {
                sentences_per_chunk: 2,
                overlap_sentences: 2,
                ..ChunkPolicy::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn backend_selector_parses_lowercase() {
        let config: RagConfig = toml::from_str("backend = \"gemini\"").unwrap();
        assert_eq!(config.backend, ModelBackend::Gemini);
    }
}
