//! Candidate term generation shared by the vocabulary and extraction passes.

pub mod candidates;
pub mod filter;
pub mod keyword;
pub mod phonetic;
pub mod skip;

pub use candidates::CandidateGenerator;
pub use skip::SkipGrams;

/// Marks the start of a word in character n-grams.
pub const WORD_BEGIN: char = '^';
/// Marks the end of a word in character n-grams.
pub const WORD_END: char = '$';
