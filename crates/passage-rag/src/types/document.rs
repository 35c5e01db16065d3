//! Document and chunk types with page tracking for citations

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bounded span of document text carrying one embedding vector.
///
/// Chunks are immutable once persisted; re-ingesting the same document
/// produces chunks with identical ids that replace the old ones
/// wholesale. A chunk set must never mix embeddings from different
/// providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID, derived from `doc_id` and `sequence_index`
    pub id: Uuid,
    /// Parent document ID
    pub doc_id: Uuid,
    /// Position of this chunk within the document
    pub sequence_index: u32,
    /// Text content
    pub text: String,
    /// Estimated token count of `text`
    pub token_count: usize,
    /// Page number (1-indexed, when the source is paginated)
    pub page_number: Option<u32>,
    /// Embedding vector; empty until a provider attaches one
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Create a new chunk with a deterministic id.
    ///
    /// The id is a UUID v5 over the parent document id and the sequence
    /// index, so chunking the same document twice yields the same ids
    /// and an upsert overwrites rather than duplicates.
    pub fn new(
        doc_id: Uuid,
        sequence_index: u32,
        text: String,
        token_count: usize,
        page_number: Option<u32>,
    ) -> Self {
        let id = Uuid::new_v5(&doc_id, &sequence_index.to_be_bytes());
        Self {
            id,
            doc_id,
            sequence_index,
            text,
            token_count,
            page_number,
            embedding: Vec::new(),
        }
    }

    /// Attach an embedding vector, consuming the chunk
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// A page of extracted text, produced by the ingestion collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,
    /// Extracted text content
    pub text: String,
}

/// A document that has been ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Path the ingestion collaborator read the document from
    pub source_path: String,
    /// Chunks in document order
    pub chunks: Vec<Chunk>,
}

impl Document {
    /// Create a document from already-produced chunks
    pub fn new(id: Uuid, source_path: impl Into<String>, chunks: Vec<Chunk>) -> Self {
        Self {
            id,
            source_path: source_path.into(),
            chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_are_deterministic() {
        let doc_id = Uuid::new_v4();
        let a = Chunk::new(doc_id, 3, "text".into(), 1, None);
        let b = Chunk::new(doc_id, 3, "other text".into(), 3, Some(2));
        assert_eq!(a.id, b.id);

        let c = Chunk::new(doc_id, 4, "text".into(), 1, None);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn chunk_ids_differ_across_documents() {
        let a = Chunk::new(Uuid::new_v4(), 0, "text".into(), 1, None);
        let b = Chunk::new(Uuid::new_v4(), 0, "text".into(), 1, None);
        assert_ne!(a.id, b.id);
    }
}
