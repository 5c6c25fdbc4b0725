//! Bijective mapping between outcome labels and numeric class ids.

use crate::error::{Result, TcError};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

/// Sorted labels numbered consecutively from a start index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMapping {
    to_index: BTreeMap<String, u32>,
    to_label: BTreeMap<u32, String>,
}

impl LabelMapping {
    /// Number the distinct labels in sorted order, starting at `start`.
    pub fn from_labels<S: AsRef<str>>(labels: impl IntoIterator<Item = S>, start: u32) -> Self {
        let sorted: BTreeSet<String> = labels.into_iter().map(|l| l.as_ref().to_string()).collect();
        let mut mapping = Self {
            to_index: BTreeMap::new(),
            to_label: BTreeMap::new(),
        };
        for (offset, label) in sorted.into_iter().enumerate() {
            let index = start + offset as u32;
            mapping.to_label.insert(index, label.clone());
            mapping.to_index.insert(label, index);
        }
        mapping
    }

    /// Class id of a label; unknown labels are a hard error.
    pub fn index_of(&self, label: &str) -> Result<u32> {
        self.to_index
            .get(label)
            .copied()
            .ok_or_else(|| TcError::LabelMismatch {
                label: label.to_string(),
            })
    }

    pub fn label_of(&self, index: u32) -> Option<&str> {
        self.to_label.get(&index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.to_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_index.is_empty()
    }

    /// `(label, index)` in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.to_label.iter().map(|(i, l)| (l.as_str(), *i))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.to_label.values().map(String::as_str)
    }

    /// `label<TAB>index` per line.
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for (label, index) in self.iter() {
            let _ = writeln!(out, "{label}\t{index}");
        }
        out
    }

    /// Parse a mapping file; both directions must stay one-to-one.
    pub fn from_tsv(content: &str) -> Result<Self> {
        let mut mapping = Self {
            to_index: BTreeMap::new(),
            to_label: BTreeMap::new(),
        };
        for (line_no, line) in content.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let (label, index) = line
                .rsplit_once('\t')
                .ok_or_else(|| TcError::parse("label mapping", line_no + 1, "expected label<TAB>index"))?;
            let index: u32 = index.parse().map_err(|_| {
                TcError::parse("label mapping", line_no + 1, format!("invalid index '{index}'"))
            })?;
            if mapping.to_index.contains_key(label) || mapping.to_label.contains_key(&index) {
                return Err(TcError::parse(
                    "label mapping",
                    line_no + 1,
                    format!("'{label}'/{index} breaks the one-to-one mapping"),
                ));
            }
            mapping.to_index.insert(label.to_string(), index);
            mapping.to_label.insert(index, label.to_string());
        }
        Ok(mapping)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_tsv())?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_tsv(&std::fs::read_to_string(path)?)
    }
}
