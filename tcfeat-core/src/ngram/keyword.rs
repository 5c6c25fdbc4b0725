//! Keyword sequences for keyword-anchored n-grams.
//!
//! Each sentence contributes the keywords it contains, in token order, and
//! optionally a comma marker and a sentence-boundary marker. N-grams are then
//! formed over the resulting sequence for the whole document.

use crate::document::View;
use std::collections::HashSet;

pub const SENTENCE_BOUNDARY: &str = "SB";
pub const COMMA: &str = "CA";
/// Joins the words of a multi-token keyword into one sequence element.
pub const MID_NGRAM_GLUE: &str = "_A";

/// Matches keywords (including multi-token keywords) inside sentences.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    keywords: HashSet<String>,
    mark_sentence_boundary: bool,
    mark_sentence_location: bool,
    include_commas: bool,
}

impl KeywordMatcher {
    pub fn new<S: AsRef<str>>(keywords: impl IntoIterator<Item = S>) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| {
                    k.as_ref()
                        .split_whitespace()
                        .map(str::to_lowercase)
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .filter(|k| !k.is_empty())
                .collect(),
            mark_sentence_boundary: true,
            mark_sentence_location: false,
            include_commas: false,
        }
    }

    pub fn with_sentence_boundary(mut self, mark: bool) -> Self {
        self.mark_sentence_boundary = mark;
        self
    }

    pub fn with_sentence_location(mut self, mark: bool) -> Self {
        self.mark_sentence_location = mark;
        self
    }

    pub fn with_commas(mut self, include: bool) -> Self {
        self.include_commas = include;
        self
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    fn boundary_marker(&self, sentence_index: usize, total: usize) -> String {
        if !self.mark_sentence_location {
            return SENTENCE_BOUNDARY.to_string();
        }
        let position = sentence_index as f64 / total as f64;
        let location = if position < 0.25 {
            "BEG"
        } else if position > 0.75 {
            "END"
        } else {
            "MID"
        };
        format!("{SENTENCE_BOUNDARY}{location}")
    }

    /// The keyword sequence of a view, tokens lower-cased.
    pub fn sequence(&self, view: &View<'_>) -> Vec<String> {
        let total = view.sentence_count();
        let mut sequence = Vec::new();
        for (sentence_index, sentence) in view.sentences.iter().enumerate() {
            let words: Vec<String> = sentence.iter().map(|t| t.text.to_lowercase()).collect();
            for end in 0..words.len() {
                // every span ending at this token, shortest first
                let mut span = String::new();
                let mut matched = false;
                for start in (0..=end).rev() {
                    span = if span.is_empty() {
                        words[start].clone()
                    } else {
                        format!("{} {span}", words[start])
                    };
                    if self.keywords.contains(&span) {
                        sequence.push(span.replace(' ', MID_NGRAM_GLUE));
                        matched = true;
                    }
                }
                if !matched && self.include_commas && words[end] == "," {
                    sequence.push(COMMA.to_string());
                }
            }
            if self.mark_sentence_boundary {
                sequence.push(self.boundary_marker(sentence_index, total));
            }
        }
        sequence
    }
}
