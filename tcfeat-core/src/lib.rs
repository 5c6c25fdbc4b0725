//! # tcfeat core
//!
//! Feature vocabulary construction and feature encoding for text
//! classification. A meta pass over the corpus selects the top-K n-gram
//! terms per extractor; an encode pass turns documents into instances of
//! named features and serializes them with stable indices for a learner.

pub mod config;
pub mod corpus;
pub mod document;
pub mod encode;
pub mod error;
pub mod extract;
pub mod features;
pub mod ngram;
pub mod pipeline;
pub mod stats;
pub mod vocab;

// Re-export commonly used types at the crate root.
pub use config::{ExtractorConfig, NGramConfig, NGramSource, TcConfig, ValueMode};
pub use corpus::{Corpus, InMemoryCorpus, JsonlCorpus};
pub use document::{Document, Sentence, Token, UnitSpan, View};
pub use encode::{DataFormat, EncoderState, Id2Outcome, LabelMapping, StableIndex};
pub use error::{Result, TcError};
pub use extract::{Extractor, FeatureExtractor};
pub use features::{
    Feature, FeatureMode, FeatureStore, FeatureValue, Instance, LearningMode, MissingValue,
};
pub use pipeline::{Pipeline, RunSummary};
pub use stats::{BoundedTopKSelector, FrequencyDistribution};
pub use vocab::{Vocabulary, VocabularyBuilder, VocabularySet};
