//! Features comparing the two texts of a document pair.

use crate::config::PairFeature;
use crate::document::View;
use crate::error::Result;
use crate::extract::PairFeatureExtractor;
use crate::features::{Feature, FeatureValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairExtractor {
    feature: PairFeature,
}

impl PairExtractor {
    pub fn new(feature: PairFeature) -> Self {
        Self { feature }
    }

    pub fn feature_name(&self) -> &'static str {
        match self.feature {
            PairFeature::TokenRatio => "PairTokenRatio",
            PairFeature::TokenDifference => "DiffNrOfTokens",
        }
    }
}

impl PairFeatureExtractor for PairExtractor {
    fn name(&self) -> &str {
        self.feature_name()
    }

    fn extract_pair(&self, first: &View<'_>, second: &View<'_>) -> Result<Vec<Feature>> {
        let a = first.token_count() as f64;
        let b = second.token_count() as f64;
        let value = match self.feature {
            PairFeature::TokenRatio => FeatureValue::ratio(a, b),
            PairFeature::TokenDifference => FeatureValue::Number(a - b),
        };
        Ok(vec![Feature::new(self.feature_name(), value)])
    }
}
