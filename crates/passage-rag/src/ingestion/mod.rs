//! Document chunking and offline indexing

pub mod chunker;
pub mod indexer;

pub use chunker::DocumentChunker;
pub use indexer::{ChunkIndexer, IndexReport};
