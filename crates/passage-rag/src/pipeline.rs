//! End-to-end pipeline: retrieve, assemble, generate, package

use std::sync::Arc;
use std::time::Instant;

use crate::config::RagConfig;
use crate::context::{Context, ContextAssembler};
use crate::error::Result;
use crate::providers::{self, AnswerGenerator, EmbeddingProvider};
use crate::retrieval::Retriever;
use crate::store::{RetrievalResult, VectorStore};
use crate::types::PipelineAnswer;

/// Orchestrates one question/answer cycle over the configured backends
pub struct RagPipeline {
    retriever: Retriever,
    assembler: ContextAssembler,
    generator: Arc<dyn AnswerGenerator>,
}

impl RagPipeline {
    /// Build a pipeline from a validated config, resolving every
    /// backend once
    pub async fn from_config(config: &RagConfig) -> Result<Self> {
        config.validate()?;

        let embedder = providers::build_embedder(config)?;
        let store = providers::build_store(config).await?;
        let generator = providers::build_generator(config)?;

        Ok(Self::new(embedder, store, generator, config))
    }

    /// Assemble a pipeline from already-constructed components
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn AnswerGenerator>,
        config: &RagConfig,
    ) -> Self {
        Self {
            retriever: Retriever::new(embedder, store, config.retrieval.clone()),
            assembler: ContextAssembler::new(config.retrieval.context_budget),
            generator,
        }
    }

    /// Answer a question with citations.
    ///
    /// When nothing clears the similarity threshold the generator still
    /// runs with an empty context and the response is flagged
    /// `no_context` with empty sources; that path is deliberate
    /// degradation, not an error.
    pub async fn answer_question(&self, question: &str) -> Result<PipelineAnswer> {
        let start = Instant::now();

        let results = self.retriever.retrieve(question).await?;
        let no_context = results.is_empty();
        if no_context {
            tracing::info!("no chunks cleared the threshold; answering without context");
        }

        let context = self.assembler.assemble(&results);
        let answer = self
            .generator
            .answer_question(question, &context.text)
            .await?;

        Ok(PipelineAnswer {
            answer,
            sources: context.citations,
            processing_time: start.elapsed().as_secs_f64(),
            no_context,
        })
    }

    /// Retrieve ranked chunks and the packaged context without
    /// generating an answer
    pub async fn retrieve(&self, question: &str) -> Result<(Vec<RetrievalResult>, Context)> {
        let results = self.retriever.retrieve(question).await?;
        let context = self.assembler.assemble(&results);
        Ok((results, context))
    }

    /// Summarize a text with the configured generator
    pub async fn summarize(&self, text: &str) -> Result<String> {
        self.generator.summarize(text).await
    }
}
