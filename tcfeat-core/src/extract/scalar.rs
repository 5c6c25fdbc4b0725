//! Vocabulary-free scalar features.

use crate::config::ScalarFeature;
use crate::document::View;
use crate::error::Result;
use crate::extract::FeatureExtractor;
use crate::features::{Feature, FeatureValue};
use std::collections::HashSet;

/// Computes one scalar feature per text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarExtractor {
    feature: ScalarFeature,
}

impl ScalarExtractor {
    pub fn new(feature: ScalarFeature) -> Self {
        Self { feature }
    }

    pub fn feature_name(&self) -> &'static str {
        match self.feature {
            ScalarFeature::NrOfTokens => "NrOfTokens",
            ScalarFeature::NrOfSentences => "NrOfSentences",
            ScalarFeature::TokensPerSentence => "NrOfTokensPerSentence",
            ScalarFeature::AvgTokenLength => "AvgTokenLength",
            ScalarFeature::TypeTokenRatio => "TypeTokenRatio",
        }
    }

    fn value(&self, view: &View<'_>) -> FeatureValue {
        let tokens = view.token_count();
        match self.feature {
            ScalarFeature::NrOfTokens => FeatureValue::from(tokens),
            ScalarFeature::NrOfSentences => FeatureValue::from(view.sentence_count()),
            ScalarFeature::TokensPerSentence => {
                FeatureValue::ratio(tokens as f64, view.sentence_count() as f64)
            }
            ScalarFeature::AvgTokenLength => {
                let chars: usize = view.tokens().map(|t| t.text.chars().count()).sum();
                FeatureValue::ratio(chars as f64, tokens as f64)
            }
            ScalarFeature::TypeTokenRatio => {
                let types: HashSet<String> = view.tokens().map(|t| t.text.to_lowercase()).collect();
                FeatureValue::ratio(types.len() as f64, tokens as f64)
            }
        }
    }
}

impl FeatureExtractor for ScalarExtractor {
    fn name(&self) -> &str {
        self.feature_name()
    }

    fn extract(&self, view: &View<'_>, _document_id: &str) -> Result<Vec<Feature>> {
        Ok(vec![Feature::new(self.feature_name(), self.value(view))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::features::MissingValue;

    fn value_of(feature: ScalarFeature, doc: &Document) -> FeatureValue {
        let features = ScalarExtractor::new(feature).extract(&doc.view(), &doc.id).unwrap();
        features[0].value().clone()
    }

    #[test]
    fn test_tokens_per_sentence() {
        let doc = Document::from_words("d", &[&["a", "b", "c"][..], &["d"][..]]);
        assert_eq!(
            value_of(ScalarFeature::TokensPerSentence, &doc),
            FeatureValue::Number(2.0)
        );
    }

    #[test]
    fn test_zero_sentences_is_missing_numeric() {
        let doc = Document::new("empty");
        assert_eq!(
            value_of(ScalarFeature::TokensPerSentence, &doc),
            FeatureValue::Missing(MissingValue::Numeric)
        );
        assert_eq!(
            value_of(ScalarFeature::AvgTokenLength, &doc),
            FeatureValue::Missing(MissingValue::Numeric)
        );
        assert_eq!(
            value_of(ScalarFeature::NrOfTokens, &doc),
            FeatureValue::Number(0.0)
        );
    }

    #[test]
    fn test_avg_token_length_counts_chars() {
        let doc = Document::from_words("d", &[&["ab", "äbc"][..]]);
        assert_eq!(
            value_of(ScalarFeature::AvgTokenLength, &doc),
            FeatureValue::Number(2.5)
        );
    }

    #[test]
    fn test_type_token_ratio_ignores_case() {
        let doc = Document::from_words("d", &[&["The", "the", "cat", "sat"][..]]);
        assert_eq!(
            value_of(ScalarFeature::TypeTokenRatio, &doc),
            FeatureValue::Number(0.75)
        );
    }
}
