//! Feature extraction (encode pass).
//!
//! Extractors are a closed set: vocabulary-backed n-gram extractors,
//! vocabulary-free scalar extractors, and pair extractors that compare the two
//! texts of a document pair. [`Extractor`] dispatches over them.

pub mod ngram;
pub mod pair;
pub mod scalar;

pub use ngram::NGramExtractor;
pub use pair::PairExtractor;
pub use scalar::ScalarExtractor;

use crate::config::ExtractorConfig;
use crate::document::View;
use crate::error::{Result, TcError};
use crate::features::Feature;
use crate::vocab::VocabularySet;

/// Prefix of features computed on the first text of a pair.
pub const FIRST_VIEW_PREFIX: &str = "v1_";
/// Prefix of features computed on the second text of a pair.
pub const SECOND_VIEW_PREFIX: &str = "v2_";

/// Extracts features from a single text.
pub trait FeatureExtractor {
    fn name(&self) -> &str;

    fn extract(&self, view: &View<'_>, document_id: &str) -> Result<Vec<Feature>>;
}

/// Extracts features comparing two texts.
pub trait PairFeatureExtractor {
    fn name(&self) -> &str;

    fn extract_pair(&self, first: &View<'_>, second: &View<'_>) -> Result<Vec<Feature>>;
}

/// The text(s) one instance is built from.
#[derive(Debug, Clone)]
pub struct ExtractionTarget<'a> {
    pub document_id: &'a str,
    pub first: View<'a>,
    pub second: Option<View<'a>>,
}

impl<'a> ExtractionTarget<'a> {
    pub fn single(document_id: &'a str, view: View<'a>) -> Self {
        Self {
            document_id,
            first: view,
            second: None,
        }
    }

    pub fn pair(document_id: &'a str, first: View<'a>, second: View<'a>) -> Self {
        Self {
            document_id,
            first,
            second: Some(second),
        }
    }
}

/// Every supported extractor kind.
#[derive(Debug, Clone)]
pub enum Extractor {
    NGram(NGramExtractor),
    Scalar(ScalarExtractor),
    Pair(PairExtractor),
}

impl Extractor {
    /// Build an extractor; n-gram extractors need their finalized vocabulary.
    pub fn from_config(config: &ExtractorConfig, vocabularies: &VocabularySet) -> Result<Self> {
        Ok(match config {
            ExtractorConfig::Ngram(ngram) => {
                let vocabulary = vocabularies.require(&ngram.name)?;
                Self::NGram(NGramExtractor::new(ngram, vocabulary)?)
            }
            ExtractorConfig::Scalar { feature } => Self::Scalar(ScalarExtractor::new(*feature)),
            ExtractorConfig::Pair { feature } => Self::Pair(PairExtractor::new(*feature)),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::NGram(e) => FeatureExtractor::name(e),
            Self::Scalar(e) => FeatureExtractor::name(e),
            Self::Pair(e) => PairFeatureExtractor::name(e),
        }
    }

    fn extract_single(&self, view: &View<'_>, document_id: &str) -> Result<Vec<Feature>> {
        match self {
            Self::NGram(e) => e.extract(view, document_id),
            Self::Scalar(e) => e.extract(view, document_id),
            Self::Pair(_) => Err(TcError::document(
                document_id,
                format!("pair extractor '{}' needs a second text", self.name()),
            )),
        }
    }

    /// Features for one instance. Single-text extractors run on both texts
    /// of a pair, with `v1_`/`v2_` name prefixes.
    pub fn extract(&self, target: &ExtractionTarget<'_>) -> Result<Vec<Feature>> {
        let Some(second) = &target.second else {
            return self.extract_single(&target.first, target.document_id);
        };
        if let Self::Pair(e) = self {
            return e.extract_pair(&target.first, second);
        }
        let mut features = prefixed(
            FIRST_VIEW_PREFIX,
            self.extract_single(&target.first, target.document_id)?,
        );
        features.extend(prefixed(
            SECOND_VIEW_PREFIX,
            self.extract_single(second, target.document_id)?,
        ));
        Ok(features)
    }
}

fn prefixed(prefix: &str, features: Vec<Feature>) -> Vec<Feature> {
    features
        .into_iter()
        .map(|f| {
            let (name, value) = f.into_parts();
            Feature::new(format!("{prefix}{name}"), value)
        })
        .collect()
}
