//! Encode pass output: stable indices, label ids and learner input files.

pub mod format;
pub mod index;
pub mod labels;
pub mod outcome;
pub mod sparse;

pub use format::DataFormat;
pub use index::{BIAS_FEATURE, BIAS_INDEX, EncoderState, StableIndex};
pub use labels::LabelMapping;
pub use outcome::{Id2Outcome, OutcomeRow};
pub use sparse::{EncodedCorpus, SparseRow, Target, encode_store};

use crate::error::{Result, TcError};
use crate::features::FeatureStore;
use std::fmt::Write as _;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const FEATURE_INDEX_FILE: &str = "feature_index.tsv";
pub const LABEL_MAPPING_FILE: &str = "label_mapping.tsv";
pub const INDEX_TO_INSTANCE_FILE: &str = "index2instanceid.tsv";

/// What [`write_encoded`] produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingSummary {
    pub data_file: PathBuf,
    pub rows: usize,
    pub features: usize,
    pub labels: usize,
    pub missing_as_zero: usize,
}

/// Encode `store` and write the data file plus its side files into `dir`.
pub fn write_encoded(
    format: DataFormat,
    store: &FeatureStore,
    state: &mut EncoderState,
    dir: &Path,
) -> Result<EncodingSummary> {
    std::fs::create_dir_all(dir)?;
    let encoded = encode_store(store, state, format.label_start())?;

    let data_file = dir.join(format.data_file_name());
    let tmp = data_file.with_extension("tmp");
    let written = std::fs::File::create(&tmp)
        .map_err(TcError::from)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            let missing = format.write_data(store, &encoded, state, &mut writer)?;
            writer.flush()?;
            Ok(missing)
        });
    let missing_as_zero = match written {
        Ok(missing) => missing,
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
    };
    std::fs::rename(&tmp, &data_file)?;
    if missing_as_zero > 0 {
        debug!(
            format = %format,
            missing_as_zero,
            "Missing values written as zero"
        );
    }

    state.index.save(&dir.join(FEATURE_INDEX_FILE))?;
    if let Some(labels) = &state.labels {
        labels.save(&dir.join(LABEL_MAPPING_FILE))?;
    }
    std::fs::write(dir.join(INDEX_TO_INSTANCE_FILE), index_to_instance(&encoded))?;

    let summary = EncodingSummary {
        data_file,
        rows: encoded.rows.len(),
        features: state.index.features().count(),
        labels: state.labels.as_ref().map_or(0, LabelMapping::len),
        missing_as_zero,
    };
    info!(
        format = %format,
        rows = summary.rows,
        features = summary.features,
        labels = summary.labels,
        path = %summary.data_file.display(),
        "Wrote encoded data"
    );
    Ok(summary)
}

fn index_to_instance(encoded: &EncodedCorpus) -> String {
    let mut out = String::from("#Index\tInstanceId\n");
    for (row, r) in encoded.rows.iter().enumerate() {
        let _ = writeln!(out, "{row}\t{}", r.instance_id);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Feature, FeatureValue, Instance, LearningMode};

    #[test]
    fn test_write_encoded_side_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FeatureStore::new(LearningMode::SingleLabel);
        let mut inst = Instance::new("doc-1").with_outcomes(["a"]);
        inst.add_feature(Feature::new("w_x", 1.0));
        store.add_instance(inst).unwrap();

        let mut state = EncoderState::new(true);
        let summary = write_encoded(DataFormat::Liblinear, &store, &mut state, dir.path()).unwrap();
        assert_eq!(summary.rows, 1);
        assert_eq!(summary.features, 1);

        let data = std::fs::read_to_string(dir.path().join("data.txt")).unwrap();
        assert_eq!(data, "0 1:1 2:1\n");
        let index = std::fs::read_to_string(dir.path().join(FEATURE_INDEX_FILE)).unwrap();
        assert_eq!(index, "x.BIAS\t1\nw_x\t2\n");
        let labels = std::fs::read_to_string(dir.path().join(LABEL_MAPPING_FILE)).unwrap();
        assert_eq!(labels, "a\t0\n");
        let ids = std::fs::read_to_string(dir.path().join(INDEX_TO_INSTANCE_FILE)).unwrap();
        assert_eq!(ids, "#Index\tInstanceId\n0\tdoc-1\n");
        assert!(!dir.path().join("data.tmp").exists());
    }

    #[test]
    fn test_failed_write_removes_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FeatureStore::new(LearningMode::Regression);
        let mut a = Instance::new("d1").with_outcomes(["1"]);
        a.add_feature(Feature::new("size", 2.0));
        let mut b = Instance::new("d2").with_outcomes(["2"]);
        b.add_feature(Feature::new("size", FeatureValue::String("big".into())));
        store.add_instances([a, b]).unwrap();

        let mut state = EncoderState::new(false);
        assert!(write_encoded(DataFormat::Arff, &store, &mut state, dir.path()).is_err());
        assert!(!dir.path().join("data.tmp").exists());
        assert!(!dir.path().join("data.arff").exists());
    }
}
