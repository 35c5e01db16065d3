//! Sentence-window text chunking
//!
//! Splits document text into sentences, groups them into sliding
//! windows, then enforces the token bounds of the policy. Identical
//! input and policy always produce an identical chunk sequence, which
//! is what makes re-ingestion safe.

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::config::ChunkPolicy;
use crate::error::{Error, Result};
use crate::types::{estimate_tokens, Chunk, Page};

/// Sentence-window chunker with configurable overlap and token bounds
pub struct DocumentChunker {
    policy: ChunkPolicy,
    /// Re-spaces sentence joins like "end.Next" into "end. Next"
    respace: Regex,
}

impl DocumentChunker {
    /// Create a chunker for the given policy
    pub fn new(policy: ChunkPolicy) -> Self {
        Self {
            policy,
            respace: Regex::new(r"\.([A-Z])").expect("invalid respace regex"),
        }
    }

    /// Chunk a non-paginated document text
    pub fn chunk_text(&self, doc_id: Uuid, text: &str) -> Result<Vec<Chunk>> {
        let sentences = self.split_into_sentences(text);
        if sentences.is_empty() {
            return Err(Error::chunking("document text is empty"));
        }
        if sentences.len() == 1 && !has_sentence_terminator(text) {
            return Err(Error::chunking("no detectable sentence boundaries"));
        }

        let pieces = self.windows_to_pieces(&sentences);
        Ok(self.assemble(doc_id, vec![(None, pieces)]))
    }

    /// Chunk a paginated document, stamping page numbers on chunks.
    ///
    /// Chunks never span pages; sequence indices run continuously
    /// across the whole document.
    pub fn chunk_pages(&self, doc_id: Uuid, pages: &[Page]) -> Result<Vec<Chunk>> {
        let mut per_page = Vec::new();
        for page in pages {
            let sentences = self.split_into_sentences(&page.text);
            if sentences.is_empty() {
                continue;
            }
            per_page.push((Some(page.number), self.windows_to_pieces(&sentences)));
        }

        if per_page.is_empty() {
            return Err(Error::chunking("document has no non-empty pages"));
        }

        Ok(self.assemble(doc_id, per_page))
    }

    /// Split text into sentence segments, dropping whitespace-only ones
    fn split_into_sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split_sentence_bounds()
            .filter(|s| !s.trim().is_empty())
            .collect()
    }

    /// Group sentences into overlapping windows and enforce `max_tokens`
    fn windows_to_pieces(&self, sentences: &[&str]) -> Vec<String> {
        let window = self.policy.sentences_per_chunk.max(1);
        let step = window - self.policy.overlap_sentences.min(window - 1);

        let mut pieces = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + window).min(sentences.len());
            pieces.extend(self.split_window(&sentences[start..end]));
            if end == sentences.len() {
                break;
            }
            start += step;
        }
        pieces
    }

    /// Split one window at sentence boundaries so no piece exceeds
    /// `max_tokens`. A single sentence longer than the limit stays
    /// whole; there is no boundary to split it at.
    fn split_window(&self, sentences: &[&str]) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for sentence in sentences {
            if !current.is_empty() {
                let mut candidate = current.clone();
                candidate.push(sentence);
                if estimate_tokens(&self.join(&candidate)) > self.policy.max_tokens {
                    pieces.push(self.join(&current));
                    current.clear();
                }
            }
            current.push(sentence);
        }

        if !current.is_empty() {
            pieces.push(self.join(&current));
        }

        pieces.retain(|p| !p.is_empty());
        pieces
    }

    /// Join sentences and normalize whitespace around boundaries
    fn join(&self, sentences: &[&str]) -> String {
        let joined = sentences.concat().replace("  ", " ");
        self.respace.replace_all(&joined, ". $1").trim().to_string()
    }

    /// Merge under-sized pieces into their predecessor and build the
    /// final chunk sequence
    fn assemble(&self, doc_id: Uuid, per_page: Vec<(Option<u32>, Vec<String>)>) -> Vec<Chunk> {
        // (page, text) with min_tokens merging applied within each page,
        // so a merge never moves text across a page citation boundary
        let mut merged: Vec<(Option<u32>, String)> = Vec::new();

        for (page, pieces) in per_page {
            let page_start = merged.len();
            for piece in pieces {
                let too_small = estimate_tokens(&piece) < self.policy.min_tokens;
                if too_small && merged.len() > page_start {
                    if let Some((_, prev_text)) = merged.last_mut() {
                        prev_text.push(' ');
                        prev_text.push_str(&piece);
                        continue;
                    }
                }
                merged.push((page, piece));
            }
        }

        merged
            .into_iter()
            .enumerate()
            .map(|(index, (page, text))| {
                let tokens = estimate_tokens(&text);
                Chunk::new(doc_id, index as u32, text, tokens, page)
            })
            .collect()
    }
}

/// Whether the text contains any sentence-final punctuation
fn has_sentence_terminator(text: &str) -> bool {
    text.chars().any(|c| matches!(c, '.' | '!' | '?'))
}
