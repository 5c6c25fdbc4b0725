//! Serializers for the supported learner input formats.

use crate::encode::index::EncoderState;
use crate::encode::labels::LabelMapping;
use crate::encode::sparse::{EncodedCorpus, SparseRow, Target};
use crate::error::{Result, TcError};
use crate::features::{FeatureMode, FeatureStore, FeatureValue, LearningMode, MissingValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write;

/// Name of the class attribute in ARFF output.
pub const ARFF_CLASS_ATTRIBUTE: &str = "__outcome";
const ARFF_RELATION: &str = "tcfeat";

/// Output format of the encode pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    /// `label idx:val ...` with a bias feature at index 1.
    #[default]
    Liblinear,
    /// `label idx:val ...` without bias.
    Libsvm,
    /// `label qid:seq idx:val ... # label seq`, one line per unit.
    SvmHmm,
    /// Weka sparse ARFF.
    Arff,
    /// The structured instance records.
    Jsonl,
}

impl DataFormat {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Liblinear => "liblinear",
            Self::Libsvm => "libsvm",
            Self::SvmHmm => "svm_hmm",
            Self::Arff => "arff",
            Self::Jsonl => "jsonl",
        }
    }

    /// File name of the main data file.
    pub fn data_file_name(&self) -> &'static str {
        match self {
            Self::Liblinear | Self::Libsvm | Self::SvmHmm => "data.txt",
            Self::Arff => "data.arff",
            Self::Jsonl => "data.jsonl",
        }
    }

    pub fn uses_bias(&self) -> bool {
        matches!(self, Self::Liblinear)
    }

    /// First class id handed out by the label mapping.
    pub fn label_start(&self) -> u32 {
        match self {
            Self::SvmHmm => 1,
            _ => 0,
        }
    }

    /// Reject mode combinations the format cannot represent.
    pub fn check_modes(&self, feature_mode: FeatureMode, learning_mode: LearningMode) -> Result<()> {
        match self {
            Self::Liblinear | Self::Libsvm if learning_mode == LearningMode::MultiLabel => Err(
                TcError::config(format!("{} does not support multi-label learning", self.name())),
            ),
            Self::SvmHmm if feature_mode != FeatureMode::Sequence => Err(TcError::config(
                "svm_hmm requires feature_mode = \"sequence\"",
            )),
            Self::SvmHmm if learning_mode != LearningMode::SingleLabel => Err(TcError::config(
                "svm_hmm supports single-label learning only",
            )),
            _ => Ok(()),
        }
    }

    /// Serialize `encoded` to `out`. Returns the number of missing values
    /// that had to be written as zero.
    pub fn write_data(
        &self,
        store: &FeatureStore,
        encoded: &EncodedCorpus,
        state: &EncoderState,
        out: &mut dyn Write,
    ) -> Result<usize> {
        match self {
            Self::Liblinear | Self::Libsvm => write_svmlight(encoded, out),
            Self::SvmHmm => write_svm_hmm(encoded, state.labels.as_ref(), out),
            Self::Arff => write_arff(store, encoded, state, out).map(|()| 0),
            Self::Jsonl => {
                for instance in store.instances() {
                    serde_json::to_writer(&mut *out, instance)?;
                    out.write_all(b"\n")?;
                }
                Ok(0)
            }
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for DataFormat {
    type Err = TcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "liblinear" => Ok(Self::Liblinear),
            "libsvm" => Ok(Self::Libsvm),
            "svm_hmm" | "svmhmm" => Ok(Self::SvmHmm),
            "arff" => Ok(Self::Arff),
            "jsonl" => Ok(Self::Jsonl),
            other => Err(TcError::config(format!("unknown data format '{other}'"))),
        }
    }
}

fn target_text(target: &Target) -> String {
    match target {
        Target::Label(index) => index.to_string(),
        Target::Value(value) => value.to_string(),
        Target::Labels(indices) => indices
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(","),
    }
}

fn push_pairs(line: &mut String, row: &SparseRow) -> usize {
    let (pairs, missing) = row.numeric_pairs();
    for (index, value) in pairs {
        let _ = write!(line, " {index}:{value}");
    }
    missing
}

fn write_svmlight(encoded: &EncodedCorpus, out: &mut dyn Write) -> Result<usize> {
    let mut missing = 0;
    for row in &encoded.rows {
        let mut line = target_text(&row.target);
        missing += push_pairs(&mut line, row);
        writeln!(out, "{line}")?;
    }
    Ok(missing)
}

fn write_svm_hmm(
    encoded: &EncodedCorpus,
    labels: Option<&LabelMapping>,
    out: &mut dyn Write,
) -> Result<usize> {
    let mut missing = 0;
    for row in &encoded.rows {
        let Target::Label(label) = row.target else {
            return Err(TcError::contract("svm_hmm rows need a single label"));
        };
        let gold = labels.and_then(|l| l.label_of(label)).unwrap_or_default();
        // svm_hmm expects positive query ids
        let mut line = format!("{label} qid:{}", row.sequence_id + 1);
        missing += push_pairs(&mut line, row);
        let _ = write!(line, " # {} {}", urlencoding::encode(gold), row.sequence_id);
        writeln!(out, "{line}")?;
    }
    Ok(missing)
}

/// ARFF attribute type derived from the values seen for one index.
#[derive(Debug, Clone, PartialEq)]
enum AttributeType {
    Numeric,
    String,
    Nominal(Vec<String>),
}

impl AttributeType {
    fn of_value(value: &FeatureValue) -> Option<Self> {
        match value {
            FeatureValue::Number(_) | FeatureValue::Boolean(_) => Some(Self::Numeric),
            FeatureValue::String(_) => Some(Self::String),
            FeatureValue::Nominal { domain, .. } => Some(Self::Nominal(domain.clone())),
            FeatureValue::Missing(_) => None,
        }
    }

    fn of_missing(missing: &MissingValue) -> Self {
        match missing {
            MissingValue::Numeric | MissingValue::Boolean => Self::Numeric,
            MissingValue::String => Self::String,
            MissingValue::Nominal { domain } => Self::Nominal(domain.clone()),
        }
    }

    fn declaration(&self) -> String {
        match self {
            Self::Numeric => "numeric".to_string(),
            Self::String => "string".to_string(),
            Self::Nominal(domain) => nominal_declaration(domain.iter().map(String::as_str)),
        }
    }

    /// Text of a value, `None` when sparse ARFF may omit it.
    fn render(&self, value: &FeatureValue) -> Option<String> {
        match (self, value) {
            (_, FeatureValue::Missing(_)) => Some("?".to_string()),
            (Self::Numeric, v) => v
                .as_f64()
                .filter(|x| *x != 0.0)
                .map(|x| x.to_string()),
            (_, FeatureValue::String(s)) => Some(arff_quote(s)),
            (_, FeatureValue::Nominal { value, .. }) => Some(arff_quote(value)),
            (_, FeatureValue::Number(x)) => Some(arff_quote(&x.to_string())),
            (_, FeatureValue::Boolean(b)) => Some(arff_quote(&b.to_string())),
        }
    }
}

fn arff_quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn nominal_declaration<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = values.map(arff_quote).collect();
    format!("{{{}}}", quoted.join(","))
}

/// One declared type per feature index. Values of a different type under the
/// same name are rejected; missing values fit any type.
fn attribute_types(
    store: &FeatureStore,
    state: &EncoderState,
) -> Result<BTreeMap<u32, AttributeType>> {
    let mut types: BTreeMap<u32, AttributeType> = BTreeMap::new();
    let mut fallback = BTreeMap::new();
    for feature in store.instances().iter().flat_map(|i| i.features()) {
        let Some(index) = state.index.get(feature.name()) else {
            continue;
        };
        match AttributeType::of_value(feature.value()) {
            Some(kind) => match types.get(&index) {
                Some(declared) if *declared != kind => {
                    return Err(TcError::contract(format!(
                        "feature '{}' has values of type {} and {}; ARFF needs one type per attribute",
                        feature.name(),
                        declared.declaration(),
                        kind.declaration()
                    )));
                }
                Some(_) => {}
                None => {
                    types.insert(index, kind);
                }
            },
            None => {
                if let FeatureValue::Missing(missing) = feature.value() {
                    fallback
                        .entry(index)
                        .or_insert_with(|| AttributeType::of_missing(missing));
                }
            }
        }
    }
    for (index, kind) in fallback {
        types.entry(index).or_insert(kind);
    }
    Ok(types)
}

fn write_arff(
    store: &FeatureStore,
    encoded: &EncodedCorpus,
    state: &EncoderState,
    out: &mut dyn Write,
) -> Result<()> {
    let mut types = attribute_types(store, state)?;
    let labels: Vec<&str> = state
        .labels
        .as_ref()
        .map(|l| l.labels().collect())
        .unwrap_or_default();
    let multi_label = encoded.learning_mode == LearningMode::MultiLabel;
    // Multi-label layouts put one binary attribute per label before the features.
    let feature_offset = if multi_label { labels.len() as u32 } else { 0 };

    if multi_label {
        writeln!(out, "@relation '{ARFF_RELATION}: -C {}'", labels.len())?;
        for label in &labels {
            writeln!(out, "@attribute {} {{0,1}}", arff_quote(label))?;
        }
    } else {
        writeln!(out, "@relation {ARFF_RELATION}")?;
    }
    writeln!(out)?;

    let features: Vec<(&str, u32)> = state.index.features().collect();
    let mut position_of = BTreeMap::new();
    for (position, (name, index)) in features.iter().enumerate() {
        let kind = types.entry(*index).or_insert(AttributeType::Numeric);
        writeln!(out, "@attribute {name} {}", kind.declaration())?;
        position_of.insert(*index, feature_offset + position as u32);
    }
    let class_position = feature_offset + features.len() as u32;
    match encoded.learning_mode {
        LearningMode::SingleLabel => writeln!(
            out,
            "@attribute {ARFF_CLASS_ATTRIBUTE} {}",
            nominal_declaration(labels.iter().copied())
        )?,
        LearningMode::Regression => writeln!(out, "@attribute {ARFF_CLASS_ATTRIBUTE} numeric")?,
        LearningMode::MultiLabel => {}
    }
    writeln!(out)?;
    writeln!(out, "@data")?;

    for row in &encoded.rows {
        let mut cells: Vec<String> = Vec::new();
        if let Target::Labels(indices) = &row.target {
            // label ids start at 0 for arff, so they are attribute positions
            cells.extend(indices.iter().map(|i| format!("{i} 1")));
        }
        for (index, value) in &row.pairs {
            let (Some(position), Some(kind)) = (position_of.get(index), types.get(index)) else {
                continue;
            };
            if let Some(text) = kind.render(value) {
                cells.push(format!("{position} {text}"));
            }
        }
        match &row.target {
            Target::Label(_) => {
                let label = row.outcomes.first().map(String::as_str).unwrap_or_default();
                cells.push(format!("{class_position} {}", arff_quote(label)));
            }
            Target::Value(value) => cells.push(format!("{class_position} {value}")),
            Target::Labels(_) => {}
        }
        if row.weight == 1.0 {
            writeln!(out, "{{{}}}", cells.join(","))?;
        } else {
            writeln!(out, "{{{}}},{{{}}}", cells.join(","), row.weight)?;
        }
    }
    Ok(())
}
