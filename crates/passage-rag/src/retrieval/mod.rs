//! Query-time retrieval: embed, search, filter, cap

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::providers::EmbeddingProvider;
use crate::store::{RetrievalResult, VectorStore};
use crate::types::Query;

/// Composes an embedding provider and a vector store to return ranked
/// chunks for a question
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    config: RetrievalConfig,
}

impl Retriever {
    /// Create a retriever
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Retrieve ranked chunks for a question.
    ///
    /// Results below the configured similarity threshold are dropped,
    /// duplicate chunk ids removed keeping the best-ranked occurrence,
    /// and the set capped at `top_k`. An empty result is not an error.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievalResult>> {
        let embedding = self.embedder.embed_single(question).await?;
        let query = Query::new(question, embedding);

        let hits = self
            .store
            .search(
                &query.embedding,
                self.config.top_k,
                self.config.similarity_threshold,
            )
            .await?;

        // The store already applied threshold and cap; dedup here so
        // the retriever's no-duplicates guarantee does not depend on
        // any particular backend
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut results: Vec<RetrievalResult> = hits
            .into_iter()
            .filter(|hit| seen.insert(hit.chunk.id))
            .take(self.config.top_k)
            .collect();

        for (rank, result) in results.iter_mut().enumerate() {
            result.rank = rank;
        }

        tracing::debug!(
            question_chars = question.len(),
            results = results.len(),
            "retrieval complete"
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::providers::local::HashEmbedder;
    use crate::store::MemoryVectorStore;
    use crate::types::Chunk;

    async fn seeded_retriever(threshold: Option<f32>) -> Retriever {
        let embedder = Arc::new(HashEmbedder::new(&EmbeddingConfig {
            dimensions: 64,
            batch_size: 8,
            ..EmbeddingConfig::default()
        }));
        let store = Arc::new(MemoryVectorStore::new(64));

        let doc_id = Uuid::from_u128(5);
        let texts = [
            "The solar panel produces energy from sunlight.",
            "Wind turbines convert wind into electricity.",
            "A recipe for sourdough bread with rye flour.",
        ];
        let mut chunks = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let vector = embedder.embed_single(text).await.unwrap();
            chunks.push(
                Chunk::new(doc_id, i as u32, text.to_string(), 10, None).with_embedding(vector),
            );
        }
        store.upsert(&chunks).await.unwrap();

        Retriever::new(
            embedder,
            store,
            RetrievalConfig {
                top_k: 2,
                similarity_threshold: threshold,
                context_budget: 256,
            },
        )
    }

    #[tokio::test]
    async fn returns_ranked_unique_results_capped_at_top_k() {
        let retriever = seeded_retriever(None).await;
        let results = retriever
            .retrieve("How do solar panels produce energy?")
            .await
            .unwrap();

        assert!(!results.is_empty());
        assert!(results.len() <= 2);
        assert!(results[0].chunk.text.contains("solar"));

        let mut ids: Vec<Uuid> = results.iter().map(|r| r.chunk.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), results.len());

        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.rank, i);
        }
    }

    #[tokio::test]
    async fn impossible_threshold_yields_empty_result_not_error() {
        let retriever = seeded_retriever(Some(0.999)).await;
        let results = retriever.retrieve("completely unrelated query").await.unwrap();
        assert!(results.is_empty());
    }
}
