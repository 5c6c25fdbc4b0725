//! Instance-id to prediction report.
//!
//! ```text
//! #ID=PREDICTION;GOLDSTANDARD;THRESHOLD
//! #labels 0=arts 1=sports
//! d1=1;1;-1
//! d2=1;0;-1
//! ```
//!
//! Labels in the header are URL-encoded. Multi-label rows carry per-label
//! scores as prediction and a binary gold vector, both comma-separated, and
//! the decision threshold.

use crate::encode::labels::LabelMapping;
use crate::error::{Result, TcError};
use crate::features::{FeatureStore, LearningMode};
use std::fmt::Write as _;
use std::path::Path;

pub const ID2OUTCOME_FILE: &str = "id2outcome.txt";
pub const HEADER: &str = "#ID=PREDICTION;GOLDSTANDARD;THRESHOLD";
const LABELS_PREFIX: &str = "#labels";
/// Threshold written when the learner does not use one.
pub const NO_THRESHOLD: f64 = -1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeRow {
    pub instance_id: String,
    pub prediction: String,
    pub gold: String,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Id2Outcome {
    /// `(index, label)` pairs of the header; empty for regression.
    pub labels: Vec<(u32, String)>,
    pub rows: Vec<OutcomeRow>,
}

impl Id2Outcome {
    /// Pair learner predictions with the gold outcomes of `store`.
    ///
    /// `predictions` has one line per instance in store order; `#` lines are
    /// skipped and only the text before the first `;` is used. Single-label
    /// predictions are class ids, multi-label predictions are comma-separated
    /// per-label scores, regression predictions are values.
    pub fn from_predictions(
        store: &FeatureStore,
        labels: Option<&LabelMapping>,
        predictions: &str,
        multi_label_threshold: f64,
    ) -> Result<Self> {
        let lines: Vec<&str> = predictions
            .lines()
            .filter(|l| !l.starts_with('#') && !l.trim().is_empty())
            .map(|l| l.split(';').next().unwrap_or(l).trim())
            .collect();
        if lines.len() != store.len() {
            return Err(TcError::contract(format!(
                "{} predictions for {} instances",
                lines.len(),
                store.len()
            )));
        }

        let mode = store.learning_mode();
        let mapping = match (mode, labels) {
            (LearningMode::Regression, _) => None,
            (_, Some(mapping)) => Some(mapping),
            (_, None) => return Err(TcError::contract("classification requires a label mapping")),
        };

        let mut rows = Vec::with_capacity(lines.len());
        for (line_no, (instance, prediction)) in store.instances().iter().zip(lines).enumerate() {
            let parse_error =
                |msg: String| TcError::parse("predictions", line_no + 1, msg);
            let row = match (mode, mapping) {
                (LearningMode::SingleLabel, Some(mapping)) => {
                    let predicted = parse_class(prediction).map_err(parse_error)?;
                    if mapping.label_of(predicted).is_none() {
                        return Err(TcError::LabelMismatch {
                            label: predicted.to_string(),
                        });
                    }
                    let gold = instance
                        .outcomes()
                        .first()
                        .map(|o| mapping.index_of(o))
                        .transpose()?
                        .ok_or_else(|| {
                            TcError::contract(format!("instance '{}' has no outcome", instance.id()))
                        })?;
                    OutcomeRow {
                        instance_id: instance.id().to_string(),
                        prediction: predicted.to_string(),
                        gold: gold.to_string(),
                        threshold: NO_THRESHOLD,
                    }
                }
                (LearningMode::MultiLabel, Some(mapping)) => {
                    let scores = prediction
                        .split([',', ' '])
                        .filter(|s| !s.is_empty())
                        .map(|s| {
                            s.parse::<f64>()
                                .map_err(|_| parse_error(format!("invalid score '{s}'")))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    if scores.len() != mapping.len() {
                        return Err(parse_error(format!(
                            "{} scores for {} labels",
                            scores.len(),
                            mapping.len()
                        )));
                    }
                    let gold: Vec<&str> = mapping
                        .labels()
                        .map(|l| {
                            if instance.outcomes().iter().any(|o| o == l) {
                                "1"
                            } else {
                                "0"
                            }
                        })
                        .collect();
                    OutcomeRow {
                        instance_id: instance.id().to_string(),
                        prediction: scores
                            .iter()
                            .map(f64::to_string)
                            .collect::<Vec<_>>()
                            .join(","),
                        gold: gold.join(","),
                        threshold: multi_label_threshold,
                    }
                }
                _ => {
                    let predicted: f64 = prediction
                        .parse()
                        .map_err(|_| parse_error(format!("invalid value '{prediction}'")))?;
                    let gold = instance.outcomes().first().cloned().unwrap_or_default();
                    OutcomeRow {
                        instance_id: instance.id().to_string(),
                        prediction: predicted.to_string(),
                        gold,
                        threshold: NO_THRESHOLD,
                    }
                }
            };
            rows.push(row);
        }

        Ok(Self {
            labels: mapping
                .map(|m| m.iter().map(|(l, i)| (i, l.to_string())).collect())
                .unwrap_or_default(),
            rows,
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(HEADER);
        out.push('\n');
        out.push_str(LABELS_PREFIX);
        for (index, label) in &self.labels {
            let _ = write!(out, " {index}={}", urlencoding::encode(label));
        }
        out.push('\n');
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{}={};{};{}",
                row.instance_id, row.prediction, row.gold, row.threshold
            );
        }
        out
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut report = Self::default();
        for (line_no, line) in content.lines().enumerate() {
            if let Some(rest) = line.strip_prefix(LABELS_PREFIX) {
                for entry in rest.split_whitespace() {
                    let (index, label) = entry.split_once('=').ok_or_else(|| {
                        TcError::parse(ID2OUTCOME_FILE, line_no + 1, format!("bad label '{entry}'"))
                    })?;
                    let index = index.parse().map_err(|_| {
                        TcError::parse(ID2OUTCOME_FILE, line_no + 1, format!("bad index '{index}'"))
                    })?;
                    let label = urlencoding::decode(label)
                        .map_err(|e| TcError::parse(ID2OUTCOME_FILE, line_no + 1, e.to_string()))?;
                    report.labels.push((index, label.into_owned()));
                }
                continue;
            }
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let bad = || TcError::parse(ID2OUTCOME_FILE, line_no + 1, "expected id=pred;gold;threshold");
            let (id, values) = line.rsplit_once('=').ok_or_else(bad)?;
            let mut fields = values.split(';');
            let (Some(prediction), Some(gold), Some(threshold), None) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                return Err(bad());
            };
            report.rows.push(OutcomeRow {
                instance_id: id.to_string(),
                prediction: prediction.to_string(),
                gold: gold.to_string(),
                threshold: threshold.parse().map_err(|_| bad())?,
            });
        }
        Ok(report)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Share of single-label rows whose prediction equals the gold id.
    pub fn agreement(&self) -> Option<f64> {
        if self.rows.is_empty() || self.labels.is_empty() {
            return None;
        }
        let hits = self.rows.iter().filter(|r| r.prediction == r.gold).count();
        Some(hits as f64 / self.rows.len() as f64)
    }
}

fn parse_class(text: &str) -> std::result::Result<u32, String> {
    let value: f64 = text
        .parse()
        .map_err(|_| format!("invalid class id '{text}'"))?;
    if value < 0.0 || value.fract() != 0.0 {
        return Err(format!("invalid class id '{text}'"));
    }
    Ok(value as u32)
}
