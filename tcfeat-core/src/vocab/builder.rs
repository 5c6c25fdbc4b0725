//! Per-feature-type vocabulary builder: `Init -> Accumulating -> Finalized`.

use crate::config::NGramConfig;
use crate::document::View;
use crate::error::{Result, TcError};
use crate::ngram::CandidateGenerator;
use crate::stats::{BoundedTopKSelector, FrequencyDistribution};
use crate::vocab::vocabulary::{Vocabulary, VocabularyStats};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Lifecycle of a [`VocabularyBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuilderState {
    Init,
    Accumulating,
    Finalized,
}

/// Accumulates candidate terms over a corpus and selects the top K.
#[derive(Debug, Clone)]
pub struct VocabularyBuilder {
    name: String,
    top_k: usize,
    min_count: u64,
    min_token_length: usize,
    generator: CandidateGenerator,
    state: BuilderState,
    distribution: FrequencyDistribution,
    documents: usize,
}

impl VocabularyBuilder {
    /// Fails on an invalid configuration, including an unset vocabulary size.
    pub fn new(config: &NGramConfig) -> Result<Self> {
        let top_k = config.vocabulary_size()?;
        let generator = CandidateGenerator::from_config(config)?;
        Ok(Self {
            name: config.name.clone(),
            top_k,
            min_count: config.min_count,
            min_token_length: config.min_token_length,
            generator,
            state: BuilderState::Init,
            distribution: FrequencyDistribution::new(),
            documents: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// The generator used for candidates, shared with parallel workers.
    pub fn generator(&self) -> &CandidateGenerator {
        &self.generator
    }

    /// Distribution accumulated so far.
    pub fn distribution(&self) -> &FrequencyDistribution {
        &self.distribution
    }

    fn ensure_open(&mut self) -> Result<()> {
        if self.state == BuilderState::Finalized {
            return Err(TcError::vocabulary_state(format!(
                "vocabulary '{}' is finalized; no further accumulation is allowed",
                self.name
            )));
        }
        self.state = BuilderState::Accumulating;
        Ok(())
    }

    /// Count every candidate occurrence in one document view.
    pub fn accumulate(&mut self, view: &View<'_>, document_id: &str) -> Result<()> {
        self.ensure_open()?;
        let partial = self.generator.candidates(view, document_id)?;
        self.distribution.merge(partial);
        self.documents += 1;
        Ok(())
    }

    /// Fold in a distribution computed elsewhere with [`Self::generator`].
    pub fn merge_partial(&mut self, partial: FrequencyDistribution, documents: usize) -> Result<()> {
        self.ensure_open()?;
        self.distribution.merge(partial);
        self.documents += documents;
        Ok(())
    }

    /// Select the top K terms and close the builder.
    pub fn finalize(&mut self) -> Result<Vocabulary> {
        if self.state == BuilderState::Finalized {
            return Err(TcError::vocabulary_state(format!(
                "vocabulary '{}' was already finalized",
                self.name
            )));
        }
        if self.state == BuilderState::Init {
            warn!(vocabulary = %self.name, "Finalizing a vocabulary that saw no documents");
        }
        self.state = BuilderState::Finalized;

        let mut distribution = std::mem::take(&mut self.distribution);
        let stats = VocabularyStats {
            top_k: self.top_k,
            distinct_terms: distribution.len(),
            total_count: distribution.total(),
        };
        distribution.retain_min_count(self.min_count);
        distribution.retain_min_length(self.min_token_length);
        if distribution.len() < stats.distinct_terms {
            debug!(
                vocabulary = %self.name,
                dropped = stats.distinct_terms - distribution.len(),
                min_count = self.min_count,
                min_token_length = self.min_token_length,
                "Dropped rare or short terms"
            );
        }
        let selected = BoundedTopKSelector::new(self.top_k).select(&distribution);
        info!(
            vocabulary = %self.name,
            documents = self.documents,
            distinct = stats.distinct_terms,
            selected = selected.len(),
            top_k = self.top_k,
            "Finalized vocabulary"
        );
        let terms = selected.into_iter().map(|(term, _)| term).collect();
        Ok(Vocabulary::new(self.name.clone(), terms, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NGramSource;
    use crate::document::Document;

    fn builder(top_k: usize) -> VocabularyBuilder {
        let config = NGramConfig::new("ngram", NGramSource::Word)
            .with_range(1, 1)
            .with_top_k(top_k);
        VocabularyBuilder::new(&config).unwrap()
    }

    #[test]
    fn test_state_transitions() {
        let mut b = builder(10);
        assert_eq!(b.state(), BuilderState::Init);
        let doc = Document::from_words("d", &[&["a", "b", "a"][..]]);
        b.accumulate(&doc.view(), "d").unwrap();
        assert_eq!(b.state(), BuilderState::Accumulating);
        let vocab = b.finalize().unwrap();
        assert_eq!(b.state(), BuilderState::Finalized);
        assert_eq!(vocab.terms().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_repeated_terms_each_count() {
        let mut b = builder(10);
        let doc = Document::from_words("d", &[&["x", "x", "x", "y"][..]]);
        b.accumulate(&doc.view(), "d").unwrap();
        assert_eq!(b.distribution().count("x"), 3);
    }

    #[test]
    fn test_accumulate_after_finalize_fails() {
        let mut b = builder(10);
        b.finalize().unwrap();
        let doc = Document::from_words("d", &[&["a"][..]]);
        let err = b.accumulate(&doc.view(), "d").unwrap_err();
        assert!(matches!(err, TcError::VocabularyState(_)));
        assert!(matches!(
            b.merge_partial(FrequencyDistribution::new(), 0),
            Err(TcError::VocabularyState(_))
        ));
    }

    #[test]
    fn test_finalize_twice_fails() {
        let mut b = builder(10);
        b.finalize().unwrap();
        assert!(b.finalize().is_err());
    }

    #[test]
    fn test_top_k_truncates() {
        let mut b = builder(2);
        let doc = Document::from_words("d", &[&["a", "b", "b", "c", "c", "c"][..]]);
        b.accumulate(&doc.view(), "d").unwrap();
        let vocab = b.finalize().unwrap();
        assert_eq!(vocab.terms().collect::<Vec<_>>(), vec!["c", "b"]);
        assert_eq!(vocab.stats().distinct_terms, 3);
        assert_eq!(vocab.stats().total_count, 6);
    }

    #[test]
    fn test_min_count_drops_rare_terms() {
        let mut config = NGramConfig::new("ngram", NGramSource::Word).with_range(1, 1);
        config.min_count = 2;
        let mut b = VocabularyBuilder::new(&config).unwrap();
        let doc = Document::from_words("d", &[&["a", "b", "b"][..]]);
        b.accumulate(&doc.view(), "d").unwrap();
        let vocab = b.finalize().unwrap();
        assert_eq!(vocab.terms().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_min_token_length_drops_short_terms_before_top_k() {
        let mut config = NGramConfig::new("ngram", NGramSource::Word)
            .with_range(1, 1)
            .with_top_k(2);
        config.min_token_length = 3;
        let mut b = VocabularyBuilder::new(&config).unwrap();
        let doc = Document::from_words("d", &[&["a", "a", "a", "of", "of", "peach", "plum", "fig"][..]]);
        b.accumulate(&doc.view(), "d").unwrap();
        let vocab = b.finalize().unwrap();
        assert_eq!(vocab.terms().collect::<Vec<_>>(), vec!["plum", "peach"]);
        assert_eq!(vocab.stats().distinct_terms, 5);
    }

    #[test]
    fn test_unset_top_k_fails_at_construction() {
        let mut config = NGramConfig::default();
        config.top_k = None;
        assert!(matches!(
            VocabularyBuilder::new(&config),
            Err(TcError::Config(_))
        ));
    }

    #[test]
    fn test_merge_partial_equals_sequential() {
        let docs = [
            Document::from_words("a", &[&["p", "q"][..]]),
            Document::from_words("b", &[&["q", "r", "q"][..]]),
        ];
        let mut sequential = builder(10);
        for doc in &docs {
            sequential.accumulate(&doc.view(), &doc.id).unwrap();
        }
        let mut merged = builder(10);
        for doc in &docs {
            let partial = merged.generator().candidates(&doc.view(), &doc.id).unwrap();
            merged.merge_partial(partial, 1).unwrap();
        }
        assert_eq!(
            sequential.finalize().unwrap(),
            merged.finalize().unwrap()
        );
    }
}
