//! Corpus statistics: term frequency distributions and top-K selection.

pub mod freq;
pub mod topk;

pub use freq::FrequencyDistribution;
pub use topk::{BoundedHeap, BoundedTopKSelector};
