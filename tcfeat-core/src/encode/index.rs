//! Stable feature-name to index assignment.

use crate::encode::labels::LabelMapping;
use crate::error::{Result, TcError};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

/// Name of the intercept feature. It cannot collide with an escaped feature name.
pub const BIAS_FEATURE: &str = "x.BIAS";
/// Index reserved for the bias feature when present.
pub const BIAS_INDEX: u32 = 1;

/// Monotone mapping from feature name to a positive index.
///
/// Indices are handed out in the order names are first assigned; an assigned
/// name keeps its index. With a bias the first free index is 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableIndex {
    by_name: HashMap<String, u32>,
    names: Vec<String>,
    bias: bool,
}

impl StableIndex {
    pub fn new(bias: bool) -> Self {
        let mut index = Self {
            by_name: HashMap::new(),
            names: Vec::new(),
            bias,
        };
        if bias {
            index.assign(BIAS_FEATURE);
        }
        index
    }

    pub fn has_bias(&self) -> bool {
        self.bias
    }

    /// Index of `name`, assigning the next free index if it is new.
    pub fn assign(&mut self, name: &str) -> u32 {
        if let Some(&index) = self.by_name.get(name) {
            return index;
        }
        let index = self.names.len() as u32 + 1;
        self.by_name.insert(name.to_string(), index);
        self.names.push(name.to_string());
        index
    }

    /// Assign every new name in sorted order.
    pub fn extend_sorted<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        let mut fresh: Vec<&str> = names
            .into_iter()
            .filter(|n| !self.by_name.contains_key(*n))
            .collect();
        fresh.sort_unstable();
        fresh.dedup();
        for name in fresh {
            self.assign(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, index: u32) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.names.get(i as usize))
            .map(String::as_str)
    }

    /// Number of assigned indices, bias included.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(name, index)` in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i as u32 + 1))
    }

    /// Feature entries only, without the bias.
    pub fn features(&self) -> impl Iterator<Item = (&str, u32)> {
        self.iter().filter(|(name, _)| *name != BIAS_FEATURE)
    }

    /// `name<TAB>index` per line, ascending index.
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for (name, index) in self.iter() {
            let _ = writeln!(out, "{name}\t{index}");
        }
        out
    }

    pub fn from_tsv(content: &str) -> Result<Self> {
        let mut index = Self::new(false);
        for (line_no, line) in content.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once('\t')
                .ok_or_else(|| TcError::parse("feature index", line_no + 1, "expected name<TAB>index"))?;
            let value: u32 = value.parse().map_err(|_| {
                TcError::parse("feature index", line_no + 1, format!("invalid index '{value}'"))
            })?;
            let expected = index.len() as u32 + 1;
            if value != expected {
                return Err(TcError::parse(
                    "feature index",
                    line_no + 1,
                    format!("index {value} out of sequence, expected {expected}"),
                ));
            }
            if index.by_name.contains_key(name) {
                return Err(TcError::parse(
                    "feature index",
                    line_no + 1,
                    format!("duplicate name '{name}'"),
                ));
            }
            if name == BIAS_FEATURE {
                if value != BIAS_INDEX {
                    return Err(TcError::parse("feature index", line_no + 1, "bias must have index 1"));
                }
                index.bias = true;
            }
            index.assign(name);
        }
        Ok(index)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_tsv())?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_tsv(&std::fs::read_to_string(path)?)
    }
}

/// Mutable state of one encoding run: the feature index and label mapping.
///
/// A fresh state grows its index from the data it encodes. A frozen state
/// (built from training artifacts) never assigns new indices; unseen feature
/// names are skipped and unknown labels are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderState {
    pub index: StableIndex,
    pub labels: Option<LabelMapping>,
    frozen: bool,
}

impl EncoderState {
    pub fn new(bias: bool) -> Self {
        Self {
            index: StableIndex::new(bias),
            labels: None,
            frozen: false,
        }
    }

    /// Reuse the index and labels of a previous run.
    pub fn frozen(index: StableIndex, labels: Option<LabelMapping>) -> Self {
        Self {
            index,
            labels,
            frozen: true,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}
