//! Offline indexing: embed chunk batches concurrently, then upsert
//!
//! Ingestion is a distinct workload from query answering: independent
//! sub-batches embed concurrently under a semaphore that bounds
//! pressure on the backend, results collect append-only keyed by batch
//! offset, and the store sees one upsert at the end.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::store::VectorStore;
use crate::types::Chunk;

/// Outcome of indexing one batch of chunks
#[derive(Debug, Clone)]
pub struct IndexReport {
    /// Chunks embedded and upserted
    pub chunks_indexed: usize,
    /// Chunk indices whose embeddings degraded to zero vectors
    pub degraded: Vec<usize>,
}

/// Embeds chunks and persists them into a vector store
pub struct ChunkIndexer {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    parallel_batches: usize,
}

impl ChunkIndexer {
    /// Create an indexer
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        parallel_batches: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            parallel_batches: parallel_batches.max(1),
        }
    }

    /// Embed and upsert a set of chunks.
    ///
    /// Chunk order is preserved regardless of which sub-batch finishes
    /// first; degraded indices refer to positions in the input slice.
    pub async fn index_chunks(&self, chunks: Vec<Chunk>) -> Result<IndexReport> {
        if chunks.is_empty() {
            return Ok(IndexReport {
                chunks_indexed: 0,
                degraded: Vec::new(),
            });
        }

        let batch_size = self.embedder.max_batch_size().max(1);
        let semaphore = Arc::new(Semaphore::new(self.parallel_batches));

        let futures = chunks
            .chunks(batch_size)
            .enumerate()
            .map(|(batch_index, slice)| {
                let texts: Vec<String> = slice.iter().map(|c| c.text.clone()).collect();
                let embedder = Arc::clone(&self.embedder);
                let semaphore = Arc::clone(&semaphore);

                async move {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|_| Error::embedding("embedding semaphore closed"))?;
                    let batch = embedder.embed_batch(&texts).await?;
                    Ok::<_, Error>((batch_index, batch))
                }
            });

        let mut outcomes = Vec::with_capacity(chunks.len() / batch_size + 1);
        for outcome in join_all(futures).await {
            outcomes.push(outcome?);
        }
        outcomes.sort_by_key(|(batch_index, _)| *batch_index);

        let mut embedded = Vec::with_capacity(chunks.len());
        let mut degraded = Vec::new();
        let mut chunk_iter = chunks.into_iter();

        for (batch_index, batch) in outcomes {
            let offset = batch_index * batch_size;
            degraded.extend(batch.degraded.into_iter().map(|i| offset + i));

            for vector in batch.vectors {
                let chunk = chunk_iter
                    .next()
                    .ok_or_else(|| Error::embedding("more vectors than chunks"))?;
                embedded.push(chunk.with_embedding(vector));
            }
        }

        if !degraded.is_empty() {
            tracing::warn!(
                degraded = degraded.len(),
                total = embedded.len(),
                "indexed with degraded embeddings"
            );
        }

        self.store.upsert(&embedded).await?;

        Ok(IndexReport {
            chunks_indexed: embedded.len(),
            degraded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::providers::local::HashEmbedder;
    use crate::store::MemoryVectorStore;
    use uuid::Uuid;

    #[tokio::test]
    async fn indexes_all_chunks_across_sub_batches() {
        let embedder = Arc::new(HashEmbedder::new(&EmbeddingConfig {
            dimensions: 32,
            batch_size: 2,
            ..EmbeddingConfig::default()
        }));
        let store = Arc::new(MemoryVectorStore::new(32));
        let indexer = ChunkIndexer::new(embedder.clone(), store.clone(), 3);

        let doc_id = Uuid::from_u128(11);
        let chunks: Vec<Chunk> = (0..7)
            .map(|i| Chunk::new(doc_id, i, format!("chunk body number {i}."), 5, None))
            .collect();

        let report = indexer.index_chunks(chunks).await.unwrap();
        assert_eq!(report.chunks_indexed, 7);
        assert!(report.degraded.is_empty());
        assert_eq!(store.len().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn empty_input_is_a_no_op() {
        let embedder = Arc::new(HashEmbedder::new(&EmbeddingConfig::default()));
        let store = Arc::new(MemoryVectorStore::new(768));
        let indexer = ChunkIndexer::new(embedder, store.clone(), 2);

        let report = indexer.index_chunks(Vec::new()).await.unwrap();
        assert_eq!(report.chunks_indexed, 0);
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reindexing_same_document_does_not_duplicate() {
        let embedder = Arc::new(HashEmbedder::new(&EmbeddingConfig {
            dimensions: 32,
            batch_size: 4,
            ..EmbeddingConfig::default()
        }));
        let store = Arc::new(MemoryVectorStore::new(32));
        let indexer = ChunkIndexer::new(embedder, store.clone(), 2);

        let doc_id = Uuid::from_u128(12);
        let chunks: Vec<Chunk> = (0..3)
            .map(|i| Chunk::new(doc_id, i, format!("stable text {i}."), 4, None))
            .collect();

        indexer.index_chunks(chunks.clone()).await.unwrap();
        indexer.index_chunks(chunks).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 3);
    }
}
