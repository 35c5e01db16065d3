//! Vector storage and similarity search

pub mod memory;
pub mod pgvector;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Chunk;

pub use memory::MemoryVectorStore;
pub use pgvector::PgVectorStore;

/// A ranked similarity search hit
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// The matched chunk (embedding left empty)
    pub chunk: Chunk,
    /// Cosine similarity in -1.0..=1.0, higher is more similar
    pub score: f32,
    /// Zero-based rank within the result set
    pub rank: usize,
}

/// Trait for persisting chunk vectors and searching them by similarity
///
/// Implementations:
/// - `MemoryVectorStore`: in-memory flat index, full-scan cosine
/// - `PgVectorStore`: Postgres with the pgvector extension
///
/// Both honor the same ranking contract: non-increasing score, ties
/// broken by ascending `sequence_index`. Given the same chunks and
/// embeddings they return the same ordered chunk ids for a query.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite chunks, keyed by chunk id.
    ///
    /// Idempotent: upserting the same chunk twice leaves one copy.
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()>;

    /// Search for the `top_k` most similar chunks.
    ///
    /// Fails with `VectorStoreError::EmptyIndex` when nothing is
    /// stored and `VectorStoreError::DimensionMismatch` when the query
    /// length differs from the stored dimension.
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<RetrievalResult>>;

    /// Number of stored vectors
    async fn len(&self) -> Result<usize>;

    /// Whether the store holds no vectors
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Check if the store is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Store name for logging
    fn name(&self) -> &str;
}

/// Order scored chunks by the shared ranking contract, apply the
/// threshold, cap at `top_k` and assign ranks.
///
/// Both store variants funnel their results through this so the
/// contract cannot drift between them.
pub(crate) fn rank_results(
    mut scored: Vec<(Chunk, f32)>,
    top_k: usize,
    threshold: Option<f32>,
) -> Vec<RetrievalResult> {
    if let Some(min) = threshold {
        scored.retain(|(_, score)| *score >= min);
    }

    scored.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then(a.0.sequence_index.cmp(&b.0.sequence_index))
    });
    scored.truncate(top_k);

    scored
        .into_iter()
        .enumerate()
        .map(|(rank, (chunk, score))| RetrievalResult { chunk, score, rank })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn chunk(sequence_index: u32) -> Chunk {
        Chunk::new(
            Uuid::from_u128(1),
            sequence_index,
            format!("chunk {sequence_index}"),
            2,
            None,
        )
    }

    #[test]
    fn ranks_by_score_then_sequence_index() {
        let scored = vec![
            (chunk(4), 0.5),
            (chunk(0), 0.9),
            (chunk(2), 0.5),
            (chunk(1), 0.3),
        ];
        let results = rank_results(scored, 10, None);

        let order: Vec<u32> = results.iter().map(|r| r.chunk.sequence_index).collect();
        assert_eq!(order, vec![0, 2, 4, 1]);

        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.rank, i);
        }
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn top_k_keeps_tie_with_smaller_sequence_index() {
        let scored = vec![
            (chunk(0), 0.9),
            (chunk(3), 0.5),
            (chunk(1), 0.5),
            (chunk(2), 0.3),
            (chunk(4), 0.1),
        ];
        let results = rank_results(scored, 2, None);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.sequence_index, 0);
        assert_eq!(results[1].chunk.sequence_index, 1);
    }

    #[test]
    fn threshold_drops_low_scores() {
        let scored = vec![(chunk(0), 0.9), (chunk(1), 0.2)];
        let results = rank_results(scored, 10, Some(0.5));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.sequence_index, 0);
    }
}
