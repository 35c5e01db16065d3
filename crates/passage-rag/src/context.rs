//! Token-budgeted context assembly with aligned citations

use crate::store::RetrievalResult;
use crate::types::Citation;

/// Marker appended when a chunk had to be cut to fit the budget
const TRUNCATION_MARKER: &str = " [truncated]";

/// Maximum excerpt length in citation snippets
const EXCERPT_CHARS: usize = 160;

/// Assembled retrieval context ready for the generator
#[derive(Debug, Clone)]
pub struct Context {
    /// Context text, one `- ` bullet line per included chunk
    pub text: String,
    /// Token estimate of `text`
    pub tokens_used: usize,
    /// Citations aligned 1:1, in order, with the included chunks
    pub citations: Vec<Citation>,
}

impl Context {
    /// An empty context for the no-result degradation path
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            tokens_used: 0,
            citations: Vec::new(),
        }
    }
}

/// Packs ranked chunks into a token-bounded context
pub struct ContextAssembler {
    budget: usize,
}

impl ContextAssembler {
    /// Create an assembler with the given token budget
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    /// Greedily include chunks in rank order until the budget is hit.
    ///
    /// If the single top-ranked chunk alone exceeds the budget, its
    /// leading portion is kept with a truncation marker so the context
    /// uses the budget exactly. Deterministic for identical inputs.
    pub fn assemble(&self, results: &[RetrievalResult]) -> Context {
        if results.is_empty() {
            return Context::empty();
        }

        let mut lines: Vec<String> = Vec::new();
        let mut citations = Vec::new();
        let mut chars_used = 0usize;

        for result in results {
            let line = format!("- {}", result.chunk.text);
            let separator = usize::from(!lines.is_empty());
            let candidate_chars = chars_used + separator + line.chars().count();

            if estimate_tokens_from_chars(candidate_chars) > self.budget {
                if lines.is_empty() {
                    // Top-ranked chunk alone busts the budget: keep its
                    // leading portion so the context fills it exactly
                    let truncated = self.truncate_line(&result.chunk.text);
                    chars_used = truncated.chars().count();
                    lines.push(truncated);
                    citations.push(citation_for(result));
                }
                break;
            }

            chars_used = candidate_chars;
            lines.push(line);
            citations.push(citation_for(result));
        }

        Context {
            text: lines.join("\n"),
            tokens_used: estimate_tokens_from_chars(chars_used),
            citations,
        }
    }

    /// Cut a chunk down to exactly the budget, marker included
    fn truncate_line(&self, text: &str) -> String {
        let target_chars = self.budget * 4;
        let overhead = 2 + TRUNCATION_MARKER.chars().count();
        let keep = target_chars.saturating_sub(overhead);

        let mut line = String::from("- ");
        line.extend(text.chars().take(keep));
        line.push_str(TRUNCATION_MARKER);
        line
    }
}

fn estimate_tokens_from_chars(chars: usize) -> usize {
    chars.div_ceil(4)
}

fn citation_for(result: &RetrievalResult) -> Citation {
    Citation {
        doc_id: result.chunk.doc_id,
        page: result.chunk.page_number,
        excerpt: excerpt(&result.chunk.text),
    }
}

/// Shorten a snippet to `EXCERPT_CHARS`, breaking at a word boundary
fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }

    let head: String = text.chars().take(EXCERPT_CHARS).collect();
    match head.rfind(' ') {
        Some(pos) => format!("{}...", &head[..pos]),
        None => format!("{head}..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{estimate_tokens, Chunk};
    use uuid::Uuid;

    fn result(sequence_index: u32, text: &str, score: f32, page: Option<u32>) -> RetrievalResult {
        let tokens = estimate_tokens(text);
        RetrievalResult {
            chunk: Chunk::new(Uuid::from_u128(3), sequence_index, text.to_string(), tokens, page),
            score,
            rank: sequence_index as usize,
        }
    }

    #[test]
    fn empty_results_produce_empty_context() {
        let context = ContextAssembler::new(100).assemble(&[]);
        assert!(context.text.is_empty());
        assert_eq!(context.tokens_used, 0);
        assert!(context.citations.is_empty());
    }

    #[test]
    fn packs_in_rank_order_within_budget() {
        let results = vec![
            result(0, "First chunk of context text here.", 0.9, Some(1)),
            result(1, "Second chunk of context text here.", 0.7, Some(2)),
        ];
        let context = ContextAssembler::new(100).assemble(&results);

        assert!(context.text.starts_with("- First chunk"));
        assert!(context.text.contains("\n- Second chunk"));
        assert!(context.tokens_used <= 100);
        assert_eq!(context.citations.len(), 2);
        assert_eq!(context.citations[0].page, Some(1));
        assert_eq!(context.citations[1].page, Some(2));
    }

    #[test]
    fn stops_before_exceeding_budget() {
        let results = vec![
            result(0, &"alpha ".repeat(20), 0.9, None),   // ~30 tokens
            result(1, &"beta ".repeat(20), 0.8, None),    // ~25 tokens
            result(2, &"gamma ".repeat(40), 0.7, None),   // ~60 tokens
        ];
        let context = ContextAssembler::new(60).assemble(&results);

        assert!(context.tokens_used <= 60);
        assert_eq!(context.citations.len(), 2);
        assert!(!context.text.contains("gamma"));
    }

    #[test]
    fn oversized_top_chunk_is_truncated_to_exact_budget() {
        let budget = 25;
        let long_text = "word ".repeat(100);
        let results = vec![result(0, long_text.trim(), 0.9, Some(4))];

        let context = ContextAssembler::new(budget).assemble(&results);

        assert_eq!(context.tokens_used, budget);
        assert_eq!(estimate_tokens(&context.text), budget);
        assert!(context.text.ends_with("[truncated]"));
        assert_eq!(context.citations.len(), 1);
        assert_eq!(context.citations[0].page, Some(4));
    }

    #[test]
    fn citations_align_with_included_chunks() {
        let results = vec![
            result(0, "Included one.", 0.9, Some(7)),
            result(1, "Included two.", 0.8, None),
        ];
        let context = ContextAssembler::new(1000).assemble(&results);

        assert_eq!(context.citations.len(), 2);
        assert_eq!(context.citations[0].excerpt, "Included one.");
        assert_eq!(context.citations[1].excerpt, "Included two.");
    }

    #[test]
    fn excerpts_break_at_word_boundaries() {
        let text = "every sentence in this excerpt keeps going well past the snippet limit \
                    because it needs enough characters to force the word boundary truncation \
                    branch to run";
        let snippet = excerpt(text);
        assert!(snippet.ends_with("..."));
        assert!(snippet.chars().count() <= EXCERPT_CHARS + 3);
        assert!(!snippet.trim_end_matches("...").ends_with(' '));
    }

    #[test]
    fn assembly_is_deterministic() {
        let results = vec![
            result(0, "Some stable text.", 0.9, None),
            result(1, "More stable text.", 0.8, None),
        ];
        let assembler = ContextAssembler::new(50);
        let a = assembler.assemble(&results);
        let b = assembler.assemble(&results);
        assert_eq!(a.text, b.text);
        assert_eq!(a.tokens_used, b.tokens_used);
        assert_eq!(a.citations, b.citations);
    }
}
