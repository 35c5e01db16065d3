//! Error types for the RAG engine

use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG engine errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chunking error (empty input, no sentence boundaries)
    #[error("Chunking failed: {0}")]
    Chunking(String),

    /// Embedding backend failure after exhausted retries
    #[error("Embedding backend error: {0}")]
    EmbeddingBackend(String),

    /// Vector store error
    #[error("Vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    /// Generation backend failure after exhausted retries
    #[error("Generation backend error: {0}")]
    GenerationBackend(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a chunking error
    pub fn chunking(message: impl Into<String>) -> Self {
        Self::Chunking(message.into())
    }

    /// Create an embedding backend error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::EmbeddingBackend(message.into())
    }

    /// Create a generation backend error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::GenerationBackend(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Vector store failure kinds
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Search against an index with no vectors
    #[error("index is empty")]
    EmptyIndex,

    /// Query vector length differs from the stored dimension
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Backend failure (connection, query, timeout)
    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<tokio_postgres::Error> for VectorStoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        VectorStoreError::Backend(err.to_string())
    }
}

impl From<tokio_postgres::Error> for Error {
    fn from(err: tokio_postgres::Error) -> Self {
        Error::VectorStore(VectorStoreError::from(err))
    }
}
