//! In-memory feature store for one corpus.
//!
//! Instances are kept in the order they were produced. The store also tracks
//! the sorted set of every feature name it has seen and enforces a single
//! learning mode for all of its instances.

use crate::error::{Result, TcError};
use crate::features::instance::Instance;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// What one instance corresponds to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureMode {
    /// One instance per document.
    #[default]
    Document,
    /// One instance per annotated unit span.
    Unit,
    /// Unit spans grouped into one sequence per sentence.
    Sequence,
    /// One instance per document pair.
    Pair,
}

/// How outcomes are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningMode {
    #[default]
    SingleLabel,
    MultiLabel,
    Regression,
}

/// Ordered instances plus the corpus-wide feature-name set.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStore {
    learning_mode: LearningMode,
    instances: Vec<Instance>,
    feature_names: BTreeSet<String>,
    non_missing: usize,
}

impl FeatureStore {
    pub fn new(learning_mode: LearningMode) -> Self {
        Self {
            learning_mode,
            instances: Vec::new(),
            feature_names: BTreeSet::new(),
            non_missing: 0,
        }
    }

    pub fn learning_mode(&self) -> LearningMode {
        self.learning_mode
    }

    fn check_outcomes(&self, instance: &Instance) -> Result<()> {
        let outcomes = instance.outcomes();
        match self.learning_mode {
            LearningMode::SingleLabel | LearningMode::Regression if outcomes.len() != 1 => {
                Err(TcError::contract(format!(
                    "instance '{}' has {} outcomes but the store is {:?}",
                    instance.id(),
                    outcomes.len(),
                    self.learning_mode
                )))
            }
            LearningMode::Regression if outcomes[0].trim().parse::<f64>().is_err() => {
                Err(TcError::contract(format!(
                    "instance '{}' has non-numeric regression outcome '{}'",
                    instance.id(),
                    outcomes[0]
                )))
            }
            _ => Ok(()),
        }
    }

    /// Append an instance, rejecting outcome counts that do not fit the learning mode.
    pub fn add_instance(&mut self, instance: Instance) -> Result<()> {
        self.check_outcomes(&instance)?;
        for feature in instance.features() {
            if !self.feature_names.contains(feature.name()) {
                self.feature_names.insert(feature.name().to_string());
            }
            if !feature.value().is_missing() {
                self.non_missing += 1;
            }
        }
        self.instances.push(instance);
        Ok(())
    }

    pub fn add_instances(&mut self, instances: impl IntoIterator<Item = Instance>) -> Result<()> {
        for instance in instances {
            self.add_instance(instance)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.instances.get(index)
    }

    /// Every feature name seen, sorted.
    pub fn feature_names(&self) -> &BTreeSet<String> {
        &self.feature_names
    }

    /// Distinct outcomes across all instances, sorted.
    pub fn unique_outcomes(&self) -> BTreeSet<String> {
        self.instances
            .iter()
            .flat_map(|i| i.outcomes().iter().cloned())
            .collect()
    }

    /// Share of non-missing values in the full names x instances matrix.
    pub fn sparsity_ratio(&self) -> f64 {
        let cells = self.feature_names.len() * self.instances.len();
        if cells == 0 {
            return 0.0;
        }
        self.non_missing as f64 / cells as f64
    }

    /// Restrict the store to a given feature space, typically the training
    /// space when encoding test data. Returns the number of removed values.
    pub fn restrict_feature_names(&mut self, names: &BTreeSet<String>) -> Result<usize> {
        if names.is_empty() {
            return Err(TcError::contract("cannot restrict a feature store to an empty feature space"));
        }
        let mut removed = 0;
        self.non_missing = 0;
        for instance in &mut self.instances {
            removed += instance.retain_features(|name| names.contains(name));
            self.non_missing += instance
                .features()
                .iter()
                .filter(|f| !f.value().is_missing())
                .count();
        }
        self.feature_names = names.clone();
        debug!(removed, names = names.len(), "Restricted feature space");
        Ok(removed)
    }

    /// Write one JSON record per instance.
    pub fn write_jsonl(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(std::fs::File::create(&tmp)?);
            for instance in &self.instances {
                serde_json::to_writer(&mut writer, instance)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp, path)?;
        info!(path = %path.display(), instances = self.len(), "Wrote feature store");
        Ok(())
    }

    /// Read a store written by [`Self::write_jsonl`].
    pub fn read_jsonl(path: &Path, learning_mode: LearningMode) -> Result<Self> {
        let reader = BufReader::new(std::fs::File::open(path)?);
        let mut store = Self::new(learning_mode);
        let source = path.display().to_string();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let instance: Instance = serde_json::from_str(&line)
                .map_err(|e| TcError::parse(&source, line_no + 1, e.to_string()))?;
            store.add_instance(instance)?;
        }
        Ok(store)
    }
}
