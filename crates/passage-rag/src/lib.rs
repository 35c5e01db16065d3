//! passage-rag: retrieval-augmented question answering with citations
//!
//! The engine chunks document text deterministically, embeds chunks
//! through a backend-agnostic provider, stores vectors for cosine
//! similarity search, packs ranked results into a token-bounded
//! context, and generates answers with citations back to the source
//! pages. Backends (local, OpenAI-compatible API, Gemini; in-memory or
//! pgvector storage) are selected by configuration once at
//! construction.

pub mod config;
pub mod context;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod store;
pub mod types;

pub use config::{ChunkPolicy, ModelBackend, RagConfig, StoreBackend};
pub use context::{Context, ContextAssembler};
pub use error::{Error, Result, VectorStoreError};
pub use ingestion::{ChunkIndexer, DocumentChunker, IndexReport};
pub use pipeline::RagPipeline;
pub use providers::{AnswerGenerator, EmbeddingProvider, GenerationOptions};
pub use retrieval::Retriever;
pub use store::{RetrievalResult, VectorStore};
pub use types::{Chunk, Citation, Document, Page, PipelineAnswer, Query};
