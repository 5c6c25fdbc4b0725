//! Conversion of a feature store into index-sorted sparse rows.

use crate::encode::index::{BIAS_INDEX, EncoderState};
use crate::encode::labels::LabelMapping;
use crate::error::{Result, TcError};
use crate::features::{FeatureStore, FeatureValue, Instance, LearningMode};
use std::collections::BTreeMap;
use tracing::debug;

/// Encoded outcome of one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Label(u32),
    Labels(Vec<u32>),
    Value(f64),
}

/// One instance as ascending `(index, value)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseRow {
    pub instance_id: String,
    pub outcomes: Vec<String>,
    pub target: Target,
    pub sequence_id: i64,
    pub weight: f64,
    pub pairs: Vec<(u32, FeatureValue)>,
}

impl SparseRow {
    /// Numeric pairs for formats without missing values.
    ///
    /// Missing values become 0 and zeros are omitted. The second element is
    /// the number of missing values that were replaced.
    pub fn numeric_pairs(&self) -> (Vec<(u32, f64)>, usize) {
        let mut missing = 0;
        let pairs = self
            .pairs
            .iter()
            .filter_map(|(index, value)| {
                let v = value.as_f64().unwrap_or_else(|| {
                    missing += 1;
                    0.0
                });
                (v != 0.0).then_some((*index, v))
            })
            .collect();
        (pairs, missing)
    }
}

/// All rows of one store, in store order.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedCorpus {
    pub learning_mode: LearningMode,
    pub rows: Vec<SparseRow>,
    /// Feature occurrences dropped because a frozen index did not know them.
    pub unknown_features: usize,
}

/// Encode `store` against `state`.
///
/// A fresh state first assigns every feature name of the store, in sorted
/// order, and numbers the store's labels from `label_start`. When two
/// features of an instance share an index the later one wins.
pub fn encode_store(
    store: &FeatureStore,
    state: &mut EncoderState,
    label_start: u32,
) -> Result<EncodedCorpus> {
    let learning_mode = store.learning_mode();
    if !state.is_frozen() {
        state
            .index
            .extend_sorted(store.feature_names().iter().map(String::as_str));
        if learning_mode != LearningMode::Regression && state.labels.is_none() {
            state.labels = Some(LabelMapping::from_labels(
                store.unique_outcomes(),
                label_start,
            ));
        }
    }

    let mut rows = Vec::with_capacity(store.len());
    let mut unknown_features = 0;
    for instance in store.instances() {
        let target = encode_target(instance, learning_mode, state.labels.as_ref())?;
        let mut cells: BTreeMap<u32, FeatureValue> = BTreeMap::new();
        if state.index.has_bias() {
            cells.insert(BIAS_INDEX, FeatureValue::Number(1.0));
        }
        for feature in instance.features() {
            match state.index.get(feature.name()) {
                Some(index) => {
                    cells.insert(index, feature.value().clone());
                }
                None => unknown_features += 1,
            }
        }
        rows.push(SparseRow {
            instance_id: instance.id().to_string(),
            outcomes: instance.outcomes().to_vec(),
            target,
            sequence_id: instance.sequence_id(),
            weight: instance.weight(),
            pairs: cells.into_iter().collect(),
        });
    }

    if unknown_features > 0 {
        debug!(
            unknown_features,
            "Dropped features absent from the frozen index"
        );
    }
    Ok(EncodedCorpus {
        learning_mode,
        rows,
        unknown_features,
    })
}

fn encode_target(
    instance: &Instance,
    learning_mode: LearningMode,
    labels: Option<&LabelMapping>,
) -> Result<Target> {
    let outcomes = instance.outcomes();
    match learning_mode {
        LearningMode::Regression => {
            let raw = outcomes.first().ok_or_else(|| {
                TcError::contract(format!("instance '{}' has no outcome", instance.id()))
            })?;
            let value = raw.trim().parse::<f64>().map_err(|_| {
                TcError::contract(format!(
                    "instance '{}' has non-numeric outcome '{raw}'",
                    instance.id()
                ))
            })?;
            Ok(Target::Value(value))
        }
        LearningMode::SingleLabel | LearningMode::MultiLabel => {
            let labels = labels
                .ok_or_else(|| TcError::contract("classification requires a label mapping"))?;
            let mut indices = outcomes
                .iter()
                .map(|o| labels.index_of(o))
                .collect::<Result<Vec<_>>>()?;
            if learning_mode == LearningMode::SingleLabel {
                let first = indices.first().copied().ok_or_else(|| {
                    TcError::contract(format!("instance '{}' has no outcome", instance.id()))
                })?;
                Ok(Target::Label(first))
            } else {
                indices.sort_unstable();
                indices.dedup();
                Ok(Target::Labels(indices))
            }
        }
    }
}
