//! In-memory flat vector index
//!
//! Holds every vector in memory and searches by full-scan cosine
//! similarity. Appropriate for corpora up to roughly ten thousand
//! chunks; beyond that, use the pgvector backend.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{Result, VectorStoreError};
use crate::types::Chunk;

use super::{rank_results, RetrievalResult, VectorStore};

/// In-memory vector store with exclusive-write/shared-read discipline.
///
/// `upsert` applies its whole batch under one write guard and `search`
/// scans under one read guard, so a concurrent search observes either
/// the pre- or post-upsert snapshot, never a partial write.
pub struct MemoryVectorStore {
    dimensions: usize,
    chunks: RwLock<HashMap<Uuid, Chunk>>,
}

impl MemoryVectorStore {
    /// Create an empty store for vectors of the given dimension
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            chunks: RwLock::new(HashMap::new()),
        }
    }
}

/// Cosine similarity; zero vectors score 0.0
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            if chunk.embedding.len() != self.dimensions {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: chunk.embedding.len(),
                }
                .into());
            }
        }

        let mut guard = self.chunks.write();
        for chunk in chunks {
            guard.insert(chunk.id, chunk.clone());
        }
        tracing::debug!(count = chunks.len(), total = guard.len(), "upserted chunks");

        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<RetrievalResult>> {
        if query.len() != self.dimensions {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            }
            .into());
        }

        let guard = self.chunks.read();
        if guard.is_empty() {
            return Err(VectorStoreError::EmptyIndex.into());
        }

        let scored: Vec<(Chunk, f32)> = guard
            .values()
            .map(|chunk| {
                let score = cosine_similarity(query, &chunk.embedding);
                let mut hit = chunk.clone();
                hit.embedding = Vec::new();
                (hit, score)
            })
            .collect();
        drop(guard);

        Ok(rank_results(scored, top_k, threshold))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.chunks.read().len())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory-flat"
    }
}
