//! Vocabulary building (meta pass) and vocabulary artifacts.

pub mod builder;
pub mod vocabulary;

pub use builder::{BuilderState, VocabularyBuilder};
pub use vocabulary::{Vocabulary, VocabularyManifest, VocabularySet, VocabularyStats};
