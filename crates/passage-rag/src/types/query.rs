//! Ephemeral per-request query type

/// A user question paired with its embedding.
///
/// Created per request, discarded after use; never persisted.
#[derive(Debug, Clone)]
pub struct Query {
    /// Question text
    pub text: String,
    /// Query embedding from the configured provider
    pub embedding: Vec<f32>,
}

impl Query {
    /// Pair a question with its embedding
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            embedding,
        }
    }
}
