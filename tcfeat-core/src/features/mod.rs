//! Features, instances and the in-memory feature store.

pub mod feature;
pub mod instance;
pub mod store;

pub use feature::{Feature, FeatureValue, MissingValue, escape_feature_name};
pub use instance::Instance;
pub use store::{FeatureMode, FeatureStore, LearningMode};
