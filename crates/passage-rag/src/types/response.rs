//! Response types for answered questions

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference back to the source chunk backing part of an answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    /// Source document ID
    pub doc_id: Uuid,
    /// Page number (if the source is paginated)
    pub page: Option<u32>,
    /// Short excerpt from the source chunk
    pub excerpt: String,
}

/// Response from the pipeline's `answer_question`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineAnswer {
    /// Generated answer text
    pub answer: String,
    /// Citations aligned with the context the answer was grounded on
    pub sources: Vec<Citation>,
    /// Wall-clock processing time in seconds
    pub processing_time: f64,
    /// True when nothing cleared the similarity threshold and the
    /// answer was generated from an empty context
    pub no_context: bool,
}
