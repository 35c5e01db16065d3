//! Local provider implementations
//!
//! Purely CPU-bound and deterministic: the embedder hashes token
//! n-grams into a fixed-dimension vector, the generator extracts the
//! best-supported passages from the context. Neither ever suspends or
//! degrades, which makes them the reference backends for tests.

use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::{EmbeddingConfig, GenerationConfig};
use crate::error::Result;
use crate::types::estimate_tokens;

use super::embedding::EmbeddingProvider;
use super::generator::{AnswerGenerator, GenerationOptions};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Feature-hashing embedder over token unigrams and bigrams.
///
/// Each feature lands in a bucket chosen by its hash, with a hash bit
/// picking the sign; the result is L2-normalized. Stable across runs
/// and processes, so re-ingested corpora stay comparable.
pub struct HashEmbedder {
    dimensions: usize,
    batch_size: usize,
}

impl HashEmbedder {
    /// Create a hash embedder from config
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            dimensions: config.dimensions,
            batch_size: config.batch_size,
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let words: Vec<String> = text
            .unicode_words()
            .map(|w| w.to_lowercase())
            .collect();

        let mut add_feature = |feature: &str, weight: f32| {
            let hash = fnv1a(feature.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign * weight;
        };

        for word in &words {
            add_feature(word, 1.0);
        }
        for pair in words.windows(2) {
            add_feature(&format!("{} {}", pair[0], pair[1]), 0.5);
        }

        l2_normalize(&vector)
    }
}

/// L2-normalize a vector; a zero vector stays zero
fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_sub_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>> {
        Ok(texts.iter().map(|t| Some(self.embed_text(t))).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "local-hash"
    }
}

/// Extractive answer generator.
///
/// Scores context bullet lines by question-term overlap and returns the
/// best-supported lines up to the token limit. Deterministic for
/// identical inputs.
pub struct ExtractiveGenerator {
    options: GenerationOptions,
}

impl ExtractiveGenerator {
    /// Create an extractive generator from config
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            options: GenerationOptions {
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            },
        }
    }

    fn select_passages(&self, question: &str, context: &str) -> String {
        let question_terms: Vec<String> = question
            .unicode_words()
            .map(|w| w.to_lowercase())
            .filter(|w| w.chars().count() > 2)
            .collect();

        // Keep original line order for equally-scored passages
        let mut scored: Vec<(usize, usize, &str)> = context
            .lines()
            .map(|line| line.trim_start_matches("- ").trim())
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(position, line)| {
                let lowered = line.to_lowercase();
                let score = question_terms
                    .iter()
                    .filter(|term| lowered.contains(term.as_str()))
                    .count();
                (score, position, line)
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let budget = self.options.max_tokens as usize;
        let mut answer = String::new();
        let mut used = 0usize;
        for (score, _, line) in scored {
            if score == 0 {
                break;
            }
            let tokens = estimate_tokens(line);
            if used + tokens > budget && !answer.is_empty() {
                break;
            }
            if !answer.is_empty() {
                answer.push(' ');
            }
            answer.push_str(line);
            used += tokens;
        }

        answer
    }
}

const NOT_FOUND_ANSWER: &str =
    "This information is not available in the provided documents.";

#[async_trait]
impl AnswerGenerator for ExtractiveGenerator {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        // Without a question to score against, fall back to the leading
        // portion of the prompt within the token limit
        let budget = (options.max_tokens as usize).saturating_mul(4);
        Ok(prompt.chars().take(budget).collect())
    }

    fn options(&self) -> GenerationOptions {
        self.options
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "local-extractive"
    }

    async fn answer_question(&self, question: &str, context: &str) -> Result<String> {
        if context.trim().is_empty() {
            return Ok(NOT_FOUND_ANSWER.to_string());
        }

        let answer = self.select_passages(question, context);
        if answer.is_empty() {
            Ok(NOT_FOUND_ANSWER.to_string())
        } else {
            Ok(answer)
        }
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let budget = (self.options.max_tokens as usize).saturating_mul(4);
        Ok(text.chars().take(budget).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::embedding::EmbeddedBatch;

    fn embedder(dimensions: usize, batch_size: usize) -> HashEmbedder {
        HashEmbedder::new(&EmbeddingConfig {
            dimensions,
            batch_size,
            ..EmbeddingConfig::default()
        })
    }

    #[tokio::test]
    async fn embeddings_have_declared_dimension() {
        let embedder = embedder(64, 8);
        let vector = embedder.embed_single("hello world").await.unwrap();
        assert_eq!(vector.len(), embedder.dimensions());
    }

    #[tokio::test]
    async fn embeddings_are_deterministic() {
        let embedder = embedder(64, 8);
        let a = embedder.embed_single("the same text").await.unwrap();
        let b = embedder.embed_single("the same text").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn embeddings_are_normalized() {
        let embedder = embedder(128, 8);
        let v = embedder.embed_single("normalize me please").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn similar_texts_score_higher_than_unrelated() {
        let embedder = embedder(256, 8);
        let a = embedder.embed_single("cats chase mice in the barn").await.unwrap();
        let b = embedder.embed_single("cats chase mice around the barn").await.unwrap();
        let c = embedder.embed_single("quarterly revenue grew by eight percent").await.unwrap();

        let dot = |x: &[f32], y: &[f32]| -> f32 { x.iter().zip(y).map(|(a, b)| a * b).sum() };
        assert!(dot(&a, &b) > dot(&a, &c));
    }

    #[tokio::test]
    async fn batch_output_order_matches_input_across_sub_batches() {
        let embedder = embedder(32, 2);
        let texts: Vec<String> = (0..5).map(|i| format!("text number {i}")).collect();

        let EmbeddedBatch { vectors, degraded } = embedder.embed_batch(&texts).await.unwrap();
        assert!(degraded.is_empty());
        assert_eq!(vectors.len(), 5);
        for (i, text) in texts.iter().enumerate() {
            let single = embedder.embed_single(text).await.unwrap();
            assert_eq!(vectors[i], single, "order broken at index {i}");
        }
    }

    #[tokio::test]
    async fn extractive_generator_picks_matching_passage() {
        let generator = ExtractiveGenerator::new(&GenerationConfig::default());
        let context = "- The mitochondria is the powerhouse of the cell.\n- Unrelated filler line.";
        let answer = generator
            .answer_question("What is the mitochondria?", context)
            .await
            .unwrap();
        assert!(answer.contains("powerhouse"));
    }

    #[tokio::test]
    async fn empty_context_yields_not_found_answer() {
        let generator = ExtractiveGenerator::new(&GenerationConfig::default());
        let answer = generator.answer_question("Anything?", "").await.unwrap();
        assert_eq!(answer, NOT_FOUND_ANSWER);
    }
}
