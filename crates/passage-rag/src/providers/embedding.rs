//! Embedding provider trait and the per-item degradation policy
//!
//! Failure handling is two-tiered. A whole-batch failure (auth,
//! network, exhausted retries) is fatal and surfaces as
//! `Error::EmbeddingBackend`. A single item failing inside an otherwise
//! successful batch is not: its slot becomes a zero vector of the
//! declared dimension and its index is recorded in
//! `EmbeddedBatch::degraded` for the caller to inspect. The boundary
//! between the two lives in `fill_degraded`, not in the error type.

use async_trait::async_trait;

use crate::error::Result;

/// Result of embedding a batch of texts
#[derive(Debug, Clone)]
pub struct EmbeddedBatch {
    /// One vector per input text, in input order
    pub vectors: Vec<Vec<f32>>,
    /// Indices of inputs that degraded to a zero vector
    pub degraded: Vec<usize>,
}

/// Trait for converting text to fixed-dimension vectors
///
/// Implementations:
/// - `HashEmbedder`: local feature-hashed vectors
/// - `OpenAiEmbedder`: OpenAI-compatible `/embeddings` endpoint
/// - `GeminiEmbedder`: Generative Language API `:embedContent`
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed one sub-batch of at most `max_batch_size` texts.
    ///
    /// A `None` entry marks an item that failed recoverably; the
    /// default `embed_batch` turns it into a zero vector. Whole-batch
    /// failures are returned as errors.
    async fn embed_sub_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>>;

    /// Fixed output dimension of this provider's vectors
    fn dimensions(&self) -> usize;

    /// Largest sub-batch the backend accepts in one request
    fn max_batch_size(&self) -> usize;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Embed many texts, transparently sub-batching larger inputs.
    ///
    /// Output order matches input order; degraded indices are global
    /// over the whole input slice.
    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddedBatch> {
        let batch_size = self.max_batch_size().max(1);
        let mut vectors = Vec::with_capacity(texts.len());
        let mut degraded = Vec::new();

        for (batch_index, sub) in texts.chunks(batch_size).enumerate() {
            let items = self.embed_sub_batch(sub).await?;
            let offset = batch_index * batch_size;
            let filled = fill_degraded(items, self.dimensions());
            degraded.extend(filled.degraded.into_iter().map(|i| offset + i));
            vectors.extend(filled.vectors);
        }

        if !degraded.is_empty() {
            tracing::warn!(
                provider = self.name(),
                degraded = degraded.len(),
                total = texts.len(),
                "some items degraded to zero vectors"
            );
        }

        Ok(EmbeddedBatch { vectors, degraded })
    }
}

/// Replace failed items with zero vectors of the given dimension.
///
/// This is the designed-silent half of the failure policy; everything
/// else propagates as an error.
pub fn fill_degraded(items: Vec<Option<Vec<f32>>>, dimensions: usize) -> EmbeddedBatch {
    let mut vectors = Vec::with_capacity(items.len());
    let mut degraded = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        match item {
            Some(vector) => vectors.push(vector),
            None => {
                degraded.push(index);
                vectors.push(vec![0.0; dimensions]);
            }
        }
    }

    EmbeddedBatch { vectors, degraded }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Provider whose items containing "fail" degrade, exercising the
    /// default `embed_batch` end to end
    struct FlakyEmbedder {
        batch_size: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyEmbedder {
        async fn embed_single(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }

        async fn embed_sub_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("fail") {
                        None
                    } else {
                        Some(vec![1.0, 0.0, 0.0])
                    }
                })
                .collect())
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn max_batch_size(&self) -> usize {
            self.batch_size
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn failed_item_becomes_zero_vector_without_error() {
        let embedder = FlakyEmbedder { batch_size: 10 };
        let texts = vec![
            "first".to_string(),
            "this one will fail".to_string(),
            "third".to_string(),
        ];

        let batch = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(batch.vectors.len(), 3);
        assert_eq!(batch.vectors[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(batch.vectors[1], vec![0.0, 0.0, 0.0]);
        assert_eq!(batch.vectors[2], vec![1.0, 0.0, 0.0]);
        assert_eq!(batch.degraded, vec![1]);
    }

    #[tokio::test]
    async fn degraded_indices_are_global_across_sub_batches() {
        let embedder = FlakyEmbedder { batch_size: 2 };
        let texts = vec![
            "ok".to_string(),
            "ok".to_string(),
            "ok".to_string(),
            "fail here".to_string(),
            "ok".to_string(),
        ];

        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.vectors.len(), 5);
        assert_eq!(batch.degraded, vec![3]);
        assert_eq!(batch.vectors[3], vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn fill_degraded_zero_fills_failed_items() {
        let items = vec![Some(vec![0.1, 0.2]), None, Some(vec![0.3, 0.4])];
        let batch = fill_degraded(items, 2);

        assert_eq!(batch.vectors.len(), 3);
        assert_eq!(batch.vectors[1], vec![0.0, 0.0]);
        assert_eq!(batch.degraded, vec![1]);
        assert_eq!(batch.vectors[0], vec![0.1, 0.2]);
        assert_eq!(batch.vectors[2], vec![0.3, 0.4]);
    }

    #[test]
    fn fill_degraded_with_no_failures_is_clean() {
        let items = vec![Some(vec![1.0]), Some(vec![2.0])];
        let batch = fill_degraded(items, 1);
        assert!(batch.degraded.is_empty());
        assert_eq!(batch.vectors.len(), 2);
    }
}
