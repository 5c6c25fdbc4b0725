//! Vocabulary-backed n-gram features.

use crate::config::{NGramConfig, ValueMode};
use crate::document::View;
use crate::error::Result;
use crate::extract::FeatureExtractor;
use crate::features::{Feature, FeatureValue};
use crate::ngram::CandidateGenerator;
use crate::vocab::Vocabulary;
use std::sync::Arc;

/// Emits `<prefix>_<term>` for every candidate term found in the vocabulary.
#[derive(Debug, Clone)]
pub struct NGramExtractor {
    name: String,
    prefix: String,
    generator: CandidateGenerator,
    vocabulary: Arc<Vocabulary>,
    value_mode: ValueMode,
}

impl NGramExtractor {
    /// Uses the same candidate generator configuration as the vocabulary pass.
    pub fn new(config: &NGramConfig, vocabulary: Arc<Vocabulary>) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            prefix: config.feature_prefix().to_string(),
            generator: CandidateGenerator::from_config(config)?,
            vocabulary,
            value_mode: config.value_mode,
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

impl FeatureExtractor for NGramExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, view: &View<'_>, document_id: &str) -> Result<Vec<Feature>> {
        let candidates = self.generator.candidates(view, document_id)?;
        let mut hits: Vec<(usize, &str, u64)> = candidates
            .iter()
            .filter_map(|(term, count)| self.vocabulary.rank(term).map(|rank| (rank, term, count)))
            .collect();
        hits.sort_unstable_by_key(|(rank, _, _)| *rank);
        Ok(hits
            .into_iter()
            .map(|(_, term, count)| {
                let value = match self.value_mode {
                    ValueMode::Binary => FeatureValue::Number(1.0),
                    ValueMode::Count => FeatureValue::Number(count as f64),
                };
                Feature::new(format!("{}_{term}", self.prefix), value)
            })
            .collect())
    }
}
