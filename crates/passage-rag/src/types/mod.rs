//! Core data types shared across the engine

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, Document, Page};
pub use query::Query;
pub use response::{Citation, PipelineAnswer};

/// Estimate the token count of a text using the 1 token ≈ 4 characters
/// heuristic shared by the chunker and the context assembler.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
