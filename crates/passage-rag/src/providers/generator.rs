//! Answer generator trait

use async_trait::async_trait;

use crate::error::Result;
use crate::generation::PromptBuilder;

/// Per-request generation parameters
#[derive(Debug, Clone, Copy)]
pub struct GenerationOptions {
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

/// Trait for producing answer text from a prompt
///
/// Implementations:
/// - `ExtractiveGenerator`: local deterministic extraction
/// - `OpenAiGenerator`: OpenAI-compatible `/chat/completions`
/// - `GeminiGenerator`: Generative Language API `:generateContent`
///
/// Backend failures surface as `Error::GenerationBackend` after bounded
/// retries; a degraded answer is never produced silently.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate text from a prompt
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;

    /// Configured default generation parameters
    fn options(&self) -> GenerationOptions;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Answer a question grounded on the given context.
    ///
    /// Uses the fixed prompt template, so identical question and
    /// context always produce an identical prompt.
    async fn answer_question(&self, question: &str, context: &str) -> Result<String> {
        let prompt = PromptBuilder::build_qa_prompt(question, context);
        self.generate(&prompt, &self.options()).await
    }

    /// Summarize a text
    async fn summarize(&self, text: &str) -> Result<String> {
        let prompt = PromptBuilder::build_summary_prompt(text);
        self.generate(&prompt, &self.options()).await
    }
}
