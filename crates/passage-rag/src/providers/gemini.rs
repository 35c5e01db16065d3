//! Gemini providers via the Generative Language API
//!
//! Uses API-key authentication. The embedding endpoint takes one text
//! per call, so batches run item by item: an item that keeps failing
//! degrades to a zero vector unless the failure is an auth error, which
//! fails the whole batch.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::RagConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::generator::{AnswerGenerator, GenerationOptions};
use super::retry::retry_with_backoff;

fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(Error::Http)
}

/// Whether an HTTP status should fail the whole batch rather than
/// degrade a single item
fn is_fatal_status(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Embedding provider for the `:embedContent` endpoint
pub struct GeminiEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
    max_retries: u32,
}

impl GeminiEmbedder {
    /// Create an embedder from config
    pub fn new(config: &RagConfig) -> Result<Self> {
        if config.gemini.api_key.trim().is_empty() {
            return Err(Error::config("missing Gemini API key"));
        }
        Ok(Self {
            client: build_client(config.remote.timeout_secs)?,
            base_url: config.gemini.base_url.trim_end_matches('/').to_string(),
            api_key: config.gemini.api_key.clone(),
            model: config.embeddings.gemini_model.clone(),
            dimensions: config.embeddings.dimensions,
            batch_size: config.embeddings.batch_size,
            max_retries: config.remote.max_retries,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:embedContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: &self.model,
            content: ContentParts {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Gemini embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "Gemini embedding failed ({status}): {body}"
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("failed to parse Gemini response: {e}")))?;

        Ok(parsed.embedding.values)
    }

    /// Embed one item with retries, distinguishing fatal auth failures
    /// from recoverable per-item failures
    async fn embed_item(&self, text: &str) -> std::result::Result<Vec<f32>, ItemFailure> {
        let mut last_error = String::new();

        for attempt in 0..=self.max_retries {
            let response = self
                .client
                .post(self.endpoint())
                .json(&EmbedRequest {
                    model: &self.model,
                    content: ContentParts {
                        parts: vec![Part {
                            text: text.to_string(),
                        }],
                    },
                })
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    match resp.json::<EmbedResponse>().await {
                        Ok(parsed) => return Ok(parsed.embedding.values),
                        Err(e) => last_error = format!("failed to parse response: {e}"),
                    }
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    if is_fatal_status(status) {
                        return Err(ItemFailure {
                            fatal: true,
                            message: format!("Gemini auth failure ({status}): {body}"),
                        });
                    }
                    last_error = format!("Gemini embedding failed ({status}): {body}");
                }
                Err(e) => last_error = format!("Gemini embedding request failed: {e}"),
            }

            if attempt < self.max_retries {
                tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
            }
        }

        Err(ItemFailure {
            fatal: false,
            message: last_error,
        })
    }
}

struct ItemFailure {
    fatal: bool,
    message: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: ContentParts,
}

#[derive(Serialize)]
struct ContentParts {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        retry_with_backoff(self.max_retries, "gemini embed", || {
            self.request_embedding(text)
        })
        .await
    }

    async fn embed_sub_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>> {
        let mut items = Vec::with_capacity(texts.len());

        for (index, text) in texts.iter().enumerate() {
            match self.embed_item(text).await {
                Ok(vector) => items.push(Some(vector)),
                Err(failure) if failure.fatal => {
                    return Err(Error::embedding(failure.message));
                }
                Err(failure) => {
                    tracing::warn!(index, error = %failure.message, "embedding item degraded");
                    items.push(None);
                }
            }
        }

        Ok(items)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.request_embedding("ping").await.is_ok())
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Answer generator for the `:generateContent` endpoint
pub struct GeminiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    options: GenerationOptions,
    max_retries: u32,
}

impl GeminiGenerator {
    /// Create a generator from config
    pub fn new(config: &RagConfig) -> Result<Self> {
        if config.gemini.api_key.trim().is_empty() {
            return Err(Error::config("missing Gemini API key"));
        }
        Ok(Self {
            client: build_client(config.remote.timeout_secs)?,
            base_url: config.gemini.base_url.trim_end_matches('/').to_string(),
            api_key: config.gemini.api_key.clone(),
            model: config.generation.gemini_model.clone(),
            options: GenerationOptions {
                temperature: config.generation.temperature,
                max_tokens: config.generation.max_tokens,
            },
            max_retries: config.remote.max_retries,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    async fn request_generation(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationRequestConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::generation(format!("Gemini request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation(format!(
                "Gemini generation failed ({status}): {body}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("failed to parse Gemini response: {e}")))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| Error::generation("no text in Gemini response"))
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationRequestConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct GenerationRequestConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: String,
}

#[async_trait]
impl AnswerGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        retry_with_backoff(self.max_retries, "gemini generate", || {
            self.request_generation(prompt, options)
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
        Ok(self.request_generation("ping", &probe).await.is_ok())
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
