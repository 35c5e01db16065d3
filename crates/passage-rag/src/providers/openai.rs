//! OpenAI-compatible API providers for embeddings and generation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::RagConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::generator::{AnswerGenerator, GenerationOptions};
use super::retry::retry_with_backoff;

fn build_client(api_key: &str, timeout_secs: u64) -> Result<Client> {
    if api_key.trim().is_empty() {
        return Err(Error::config("missing API key"));
    }

    let mut headers = HeaderMap::new();
    let auth = format!("Bearer {}", api_key.trim());
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth).map_err(|_| Error::config("invalid API key"))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .default_headers(headers)
        .build()
        .map_err(Error::Http)
}

/// Embedding provider for OpenAI-compatible `/embeddings` endpoints
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
    max_retries: u32,
}

impl OpenAiEmbedder {
    /// Create an embedder from config
    pub fn new(config: &RagConfig) -> Result<Self> {
        let client = build_client(&config.api.api_key, config.remote.timeout_secs)?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.api.base_url.trim_end_matches('/')),
            model: config.embeddings.api_model.clone(),
            dimensions: config.embeddings.dimensions,
            batch_size: config.embeddings.batch_size,
            max_retries: config.remote.max_retries,
        })
    }

    async fn request_embeddings(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::embedding(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "embedding request failed ({status}): {body}"
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("failed to parse embedding response: {e}")))?;

        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != inputs.len() {
            return Err(Error::embedding(format!(
                "backend returned {} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let inputs = [text.to_string()];
        let mut vectors = retry_with_backoff(self.max_retries, "openai embed", || {
            self.request_embeddings(&inputs)
        })
        .await?;
        vectors
            .pop()
            .ok_or_else(|| Error::embedding("no embedding in response"))
    }

    async fn embed_sub_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>> {
        // The batch endpoint succeeds or fails as a whole; per-item
        // degradation never applies here
        let vectors = retry_with_backoff(self.max_retries, "openai embed batch", || {
            self.request_embeddings(texts)
        })
        .await?;
        Ok(vectors.into_iter().map(Some).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.embed_single("ping").await.is_ok())
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Answer generator for OpenAI-compatible `/chat/completions` endpoints
pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    model: String,
    options: GenerationOptions,
    max_retries: u32,
}

impl OpenAiGenerator {
    /// Create a generator from config
    pub fn new(config: &RagConfig) -> Result<Self> {
        let client = build_client(&config.api.api_key, config.remote.timeout_secs)?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                config.api.base_url.trim_end_matches('/')
            ),
            model: config.generation.api_model.clone(),
            options: GenerationOptions {
                temperature: config.generation.temperature,
                max_tokens: config.generation.max_tokens,
            },
            max_retries: config.remote.max_retries,
        })
    }

    async fn request_completion(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_MESSAGE.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::generation(format!("generation request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation(format!(
                "generation failed ({status}): {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("failed to parse generation response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::generation("no completion in response"))
    }
}

const SYSTEM_MESSAGE: &str = "You are a helpful assistant that answers questions based on \
provided context. Always cite the context when answering.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl AnswerGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        retry_with_backoff(self.max_retries, "openai generate", || {
            self.request_completion(prompt, options)
        })
        .await
    }

    fn options(&self) -> GenerationOptions {
        self.options
    }

    async fn health_check(&self) -> Result<bool> {
        let probe = GenerationOptions {
            temperature: 0.0,
            max_tokens: 1,
        };
        Ok(self.request_completion("ping", &probe).await.is_ok())
    }

    fn name(&self) -> &str {
        "openai"
    }
}
