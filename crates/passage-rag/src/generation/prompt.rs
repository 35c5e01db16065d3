//! Prompt templates for RAG generation
//!
//! Templates are fixed strings so identical inputs always produce
//! identical prompts; the pipeline relies on this for reproducible
//! answers at temperature zero.

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the question-answering prompt from context and question
    pub fn build_qa_prompt(question: &str, context: &str) -> String {
        let context = if context.trim().is_empty() {
            "No relevant context found."
        } else {
            context
        };

        format!(
            r#"Based on the following context items, please answer the query.
Only use information from the context. If the answer is not in the
context, say that the information is not available in the provided
documents. Make sure your answers are as explanatory as possible.

Context:
{context}

Query: {question}

Answer:"#
        )
    }

    /// Build a summarization prompt
    pub fn build_summary_prompt(text: &str) -> String {
        format!(
            r#"Please provide a concise summary of the following text:

{text}

Summary:"#
        )
    }
}
