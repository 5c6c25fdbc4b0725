//! Property-based tests for core components using proptest.

use proptest::prelude::*;

use tcfeat_core::encode::{DataFormat, EncoderState, LabelMapping, encode_store};
use tcfeat_core::features::escape_feature_name;
use tcfeat_core::ngram::SkipGrams;
use tcfeat_core::ngram::skip::count_subsequences;
use tcfeat_core::stats::{BoundedTopKSelector, FrequencyDistribution};
use tcfeat_core::{Feature, FeatureStore, Instance, LearningMode};

fn distribution() -> impl Strategy<Value = FrequencyDistribution> {
    prop::collection::hash_map("[a-e]{1,3}", 1u64..20, 0..40).prop_map(|counts| {
        let mut dist = FrequencyDistribution::new();
        for (term, count) in counts {
            dist.add(&term, count);
        }
        dist
    })
}

fn store() -> impl Strategy<Value = FeatureStore> {
    let instance = (
        prop::collection::vec(("[a-z]{1,4}", -5i32..5), 0..8),
        prop::sample::select(vec!["pos", "neg", "neutral"]),
    );
    prop::collection::vec(instance, 1..12).prop_map(|rows| {
        let mut store = FeatureStore::new(LearningMode::SingleLabel);
        for (i, (features, label)) in rows.into_iter().enumerate() {
            let mut instance = Instance::new(format!("i{i}")).with_outcomes([label]);
            for (name, value) in features {
                instance.add_feature(Feature::new(name, f64::from(value)));
            }
            store.add_instance(instance).unwrap();
        }
        store
    })
}

// --- Skip n-gram properties ---

proptest! {
    #[test]
    fn contiguous_count_matches_classic_formula(
        n in 0usize..15,
        min_n in 1usize..4,
        extra in 0usize..3,
    ) {
        let max_n = min_n + extra;
        let items: Vec<usize> = (0..n).collect();
        let grams = SkipGrams::contiguous(&items, min_n, max_n).unwrap();
        let expected: usize = (min_n..=max_n).map(|l| (n + 1).saturating_sub(l)).sum();
        prop_assert_eq!(grams.iter().count(), expected);
    }

    #[test]
    fn skip_grams_respect_window_and_count(
        n in 0usize..10,
        len in 1usize..4,
        skip in 0usize..3,
    ) {
        let items: Vec<usize> = (0..n).collect();
        let grams = SkipGrams::new(&items, len, len, skip).unwrap();
        let mut seen = std::collections::HashSet::new();
        for gram in grams.iter() {
            let positions: Vec<usize> = gram.into_iter().copied().collect();
            prop_assert_eq!(positions.len(), len);
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(positions[len - 1] - positions[0] <= (len - 1) * (skip + 1));
            prop_assert!(seen.insert(positions));
        }
        prop_assert_eq!(seen.len(), count_subsequences(n, len, skip));
    }
}

// --- Top-K properties ---

proptest! {
    #[test]
    fn top_k_returns_min_of_k_and_size(dist in distribution(), k in 0usize..50) {
        let selected = BoundedTopKSelector::new(k).select(&dist);
        prop_assert_eq!(selected.len(), k.min(dist.len()));
    }

    #[test]
    fn top_k_is_idempotent(dist in distribution(), k in 0usize..50) {
        let selector = BoundedTopKSelector::new(k);
        prop_assert_eq!(selector.select(&dist), selector.select(&dist));
    }

    #[test]
    fn top_one_is_max_frequency_sample(dist in distribution()) {
        let top = BoundedTopKSelector::new(1).select(&dist);
        prop_assert_eq!(
            top.first().map(|(term, _)| term.as_str()),
            dist.sample_with_max_frequency()
        );
    }

    #[test]
    fn top_k_is_sorted_by_count(dist in distribution(), k in 1usize..50) {
        let selected = BoundedTopKSelector::new(k).select(&dist);
        prop_assert!(selected.windows(2).all(|w| w[0].1 >= w[1].1));
    }
}

// --- Encoding properties ---

proptest! {
    #[test]
    fn encoding_is_deterministic(store in store()) {
        let render = || {
            let format = DataFormat::Liblinear;
            let mut state = EncoderState::new(format.uses_bias());
            let encoded = encode_store(&store, &mut state, format.label_start()).unwrap();
            let mut buf = Vec::new();
            format.write_data(&store, &encoded, &state, &mut buf).unwrap();
            buf
        };
        prop_assert_eq!(render(), render());
    }

    #[test]
    fn sparse_indices_are_strictly_ascending(store in store()) {
        let mut state = EncoderState::new(true);
        let encoded = encode_store(&store, &mut state, 0).unwrap();
        for row in &encoded.rows {
            prop_assert!(row.pairs.windows(2).all(|w| w[0].0 < w[1].0));
            prop_assert_eq!(row.pairs.first().map(|p| p.0), Some(1));
        }
    }

    #[test]
    fn label_mapping_round_trips(
        labels in prop::collection::btree_set("[a-zA-Z ]{1,8}", 1..10),
        start in 0u32..2,
    ) {
        let mapping = LabelMapping::from_labels(&labels, start);
        for label in &labels {
            let index = mapping.index_of(label).unwrap();
            prop_assert_eq!(mapping.label_of(index), Some(label.as_str()));
        }
        prop_assert_eq!(LabelMapping::from_tsv(&mapping.to_tsv()).unwrap(), mapping);
    }

    #[test]
    fn escaped_names_are_safe_and_stable(name in "\\PC{0,12}") {
        let escaped = escape_feature_name(&name).into_owned();
        prop_assert!(escaped.chars().all(|c| c.is_alphanumeric() || c == '_'));
        prop_assert_eq!(escape_feature_name(&escaped).into_owned(), escaped);
    }
}
