//! One classification unit: features, outcomes and sequence metadata.

use crate::features::feature::Feature;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Serialized form of an [`Instance`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstanceRecord {
    id: String,
    features: Vec<Feature>,
    #[serde(default)]
    outcomes: Vec<String>,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default)]
    sequence_id: i64,
    #[serde(default)]
    sequence_position: i64,
}

fn default_weight() -> f64 {
    1.0
}

/// Features and outcomes of one document, unit or pair.
///
/// Feature names are unique within an instance: adding a name that is
/// already present logs a warning and keeps the first value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "InstanceRecord", into = "InstanceRecord")]
pub struct Instance {
    id: String,
    features: Vec<Feature>,
    names: HashSet<String>,
    outcomes: Vec<String>,
    weight: f64,
    sequence_id: i64,
    sequence_position: i64,
}

impl From<InstanceRecord> for Instance {
    // Records are taken as written: names that collided after escaping stay
    // as separate entries and are resolved by the encoder.
    fn from(record: InstanceRecord) -> Self {
        let names = record.features.iter().map(|f| f.name().to_string()).collect();
        Self {
            id: record.id,
            features: record.features,
            names,
            outcomes: record.outcomes,
            weight: record.weight,
            sequence_id: record.sequence_id,
            sequence_position: record.sequence_position,
        }
    }
}

impl From<Instance> for InstanceRecord {
    fn from(instance: Instance) -> Self {
        Self {
            id: instance.id,
            features: instance.features,
            outcomes: instance.outcomes,
            weight: instance.weight,
            sequence_id: instance.sequence_id,
            sequence_position: instance.sequence_position,
        }
    }
}

impl Instance {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            features: Vec::new(),
            names: HashSet::new(),
            outcomes: Vec::new(),
            weight: default_weight(),
            sequence_id: 0,
            sequence_position: 0,
        }
    }

    pub fn with_outcomes<S: Into<String>>(mut self, outcomes: impl IntoIterator<Item = S>) -> Self {
        self.outcomes = outcomes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sequence(mut self, sequence_id: i64, sequence_position: i64) -> Self {
        self.sequence_id = sequence_id;
        self.sequence_position = sequence_position;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Add a feature; returns `false` and warns when the name already exists.
    pub fn add_feature(&mut self, feature: Feature) -> bool {
        if self.names.contains(feature.name()) {
            warn!(
                instance = %self.id,
                feature = %feature.name(),
                "Duplicate feature name, keeping the first value"
            );
            return false;
        }
        self.names.insert(feature.name().to_string());
        self.features.push(feature);
        true
    }

    /// Add several features; returns how many were dropped as duplicates.
    pub fn add_features(&mut self, features: impl IntoIterator<Item = Feature>) -> usize {
        features
            .into_iter()
            .map(|f| usize::from(!self.add_feature(f)))
            .sum()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Features in insertion order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name() == name)
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn outcomes(&self) -> &[String] {
        &self.outcomes
    }

    pub fn add_outcome(&mut self, outcome: impl Into<String>) {
        self.outcomes.push(outcome.into());
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn sequence_id(&self) -> i64 {
        self.sequence_id
    }

    pub fn sequence_position(&self) -> i64 {
        self.sequence_position
    }

    /// Keep only features whose name satisfies `keep`; returns how many were removed.
    pub fn retain_features(&mut self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let before = self.features.len();
        self.features.retain(|f| keep(f.name()));
        self.names = self.features.iter().map(|f| f.name().to_string()).collect();
        before - self.features.len()
    }
}
