//! Two-pass orchestration.
//!
//! The meta pass builds one vocabulary per n-gram extractor; the encode pass
//! turns every document into instances using only finalized vocabularies.
//! Finalizing all vocabularies is the barrier between the two: the encode
//! pass takes a [`VocabularySet`], which only ever holds finalized
//! vocabularies.

use crate::config::TcConfig;
use crate::corpus::Corpus;
use crate::document::{Document, UnitSpan, View};
use crate::encode::{
    self, EncoderState, EncodingSummary, FEATURE_INDEX_FILE, LABEL_MAPPING_FILE, LabelMapping,
    StableIndex,
};
use crate::error::{Result, TcError};
use crate::extract::{ExtractionTarget, Extractor};
use crate::features::{FeatureMode, FeatureStore, Instance};
use crate::ngram::CandidateGenerator;
use crate::stats::FrequencyDistribution;
use crate::vocab::{VocabularyBuilder, VocabularySet};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory under the output dir holding the vocabulary artifacts.
pub const VOCABULARY_DIR: &str = "vocabularies";
/// Line-delimited feature store written next to the data file.
pub const FEATURE_STORE_FILE: &str = "features.jsonl";

/// Result of a full training-side run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub documents: usize,
    pub instances: usize,
    pub vocabularies: BTreeMap<String, usize>,
    pub features: usize,
    pub labels: usize,
    pub sparsity: f64,
    pub data_file: PathBuf,
}

/// Instances of one document; sequence ids are local to the document.
struct DocumentInstances {
    instances: Vec<Instance>,
    sequences: i64,
}

pub struct Pipeline {
    config: TcConfig,
}

impl Pipeline {
    /// Validates the configuration up front.
    pub fn new(config: TcConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TcConfig {
        &self.config
    }

    fn batch_size(&self) -> usize {
        self.config.parallel.batch_size.max(1)
    }

    /// Feed the corpus to `handle` in batches of `batch_size` documents.
    fn for_each_batch(
        &self,
        corpus: &dyn Corpus,
        mut handle: impl FnMut(&[Document]) -> Result<()>,
    ) -> Result<usize> {
        let batch_size = self.batch_size();
        let mut batch = Vec::with_capacity(batch_size);
        let mut documents = 0;
        for document in corpus.documents()? {
            batch.push(document?);
            if batch.len() == batch_size {
                handle(&batch)?;
                documents += batch.len();
                batch.clear();
            }
        }
        if !batch.is_empty() {
            handle(&batch)?;
            documents += batch.len();
        }
        Ok(documents)
    }

    /// The texts a document contributes to the vocabularies.
    fn meta_views<'a>(&self, document: &'a Document) -> Result<Vec<View<'a>>> {
        match self.config.feature_mode {
            FeatureMode::Document => Ok(vec![document.view()]),
            FeatureMode::Unit | FeatureMode::Sequence => document
                .units
                .iter()
                .map(|unit| document.unit_view(unit))
                .collect(),
            FeatureMode::Pair => {
                let second = document.second().ok_or_else(|| missing_second_view(document))?;
                Ok(vec![document.view(), second])
            }
        }
    }

    fn document_candidates(
        &self,
        generator: &CandidateGenerator,
        document: &Document,
    ) -> Result<FrequencyDistribution> {
        let mut distribution = FrequencyDistribution::new();
        for view in self.meta_views(document)? {
            distribution.merge(generator.candidates(&view, &document.id)?);
        }
        Ok(distribution)
    }

    /// Build and finalize one vocabulary per n-gram extractor.
    pub fn run_meta_pass(&self, corpus: &dyn Corpus) -> Result<VocabularySet> {
        let mut builders = self
            .config
            .ngram_configs()
            .map(VocabularyBuilder::new)
            .collect::<Result<Vec<_>>>()?;
        if builders.is_empty() {
            debug!("No n-gram extractors configured; skipping meta pass");
            return Ok(VocabularySet::new());
        }
        info!(
            corpus = corpus.name(),
            vocabularies = builders.len(),
            parallel = self.config.parallel.enabled,
            "Starting meta pass"
        );

        let parallel = self.config.parallel.enabled;
        let documents = self.for_each_batch(corpus, |batch| {
            for builder in &mut builders {
                let generator = builder.generator();
                let partial = if parallel {
                    batch
                        .par_iter()
                        .map(|doc| self.document_candidates(generator, doc))
                        .try_reduce(FrequencyDistribution::new, |mut acc, part| {
                            acc.merge(part);
                            Ok(acc)
                        })?
                } else {
                    let mut acc = FrequencyDistribution::new();
                    for doc in batch {
                        acc.merge(self.document_candidates(generator, doc)?);
                    }
                    acc
                };
                builder.merge_partial(partial, batch.len())?;
            }
            Ok(())
        })?;

        let mut vocabularies = VocabularySet::new();
        for builder in &mut builders {
            vocabularies.insert(builder.finalize()?)?;
        }
        info!(documents, vocabularies = vocabularies.len(), "Meta pass complete");
        Ok(vocabularies)
    }

    fn build_extractors(&self, vocabularies: &VocabularySet) -> Result<Vec<Extractor>> {
        self.config
            .extractors
            .iter()
            .map(|config| Extractor::from_config(config, vocabularies))
            .collect()
    }

    fn instance_for(
        extractors: &[Extractor],
        id: String,
        target: &ExtractionTarget<'_>,
        outcomes: &[String],
        weight: f64,
    ) -> Result<Instance> {
        let mut instance = Instance::new(id)
            .with_outcomes(outcomes.iter().cloned())
            .with_weight(weight);
        for extractor in extractors {
            instance.add_features(extractor.extract(target)?);
        }
        Ok(instance)
    }

    fn document_instances(
        &self,
        extractors: &[Extractor],
        document: &Document,
    ) -> Result<DocumentInstances> {
        let id = document.id.as_str();
        let mut instances = Vec::new();
        let mut sequences = 0;
        match self.config.feature_mode {
            FeatureMode::Document => {
                let target = ExtractionTarget::single(id, document.view());
                instances.push(Self::instance_for(
                    extractors,
                    id.to_string(),
                    &target,
                    &document.outcomes,
                    document.weight,
                )?);
            }
            FeatureMode::Pair => {
                let second = document.second().ok_or_else(|| missing_second_view(document))?;
                let target = ExtractionTarget::pair(id, document.view(), second);
                instances.push(Self::instance_for(
                    extractors,
                    id.to_string(),
                    &target,
                    &document.outcomes,
                    document.weight,
                )?);
            }
            FeatureMode::Unit => {
                for (i, unit) in document.units.iter().enumerate() {
                    let target = ExtractionTarget::single(id, document.unit_view(unit)?);
                    instances.push(Self::instance_for(
                        extractors,
                        format!("{id}_{i}"),
                        &target,
                        &unit.outcomes,
                        document.weight,
                    )?);
                }
            }
            FeatureMode::Sequence => {
                let mut by_sentence: BTreeMap<usize, Vec<(usize, &UnitSpan)>> = BTreeMap::new();
                for (i, unit) in document.units.iter().enumerate() {
                    by_sentence.entry(unit.sentence).or_default().push((i, unit));
                }
                for units in by_sentence.values_mut() {
                    units.sort_by_key(|(_, u)| (u.begin, u.end));
                    for (position, (i, unit)) in units.iter().enumerate() {
                        let target = ExtractionTarget::single(id, document.unit_view(unit)?);
                        let instance = Self::instance_for(
                            extractors,
                            format!("{id}_{i}"),
                            &target,
                            &unit.outcomes,
                            document.weight,
                        )?;
                        instances.push(instance.with_sequence(sequences, position as i64));
                    }
                    sequences += 1;
                }
            }
        }
        if instances.is_empty() {
            debug!(document = id, "Document produced no instances");
        }
        Ok(DocumentInstances {
            instances,
            sequences,
        })
    }

    /// Extract instances for every document, in corpus order.
    pub fn run_encode_pass(
        &self,
        corpus: &dyn Corpus,
        vocabularies: &VocabularySet,
    ) -> Result<FeatureStore> {
        self.encode_corpus(corpus, vocabularies).map(|(store, _)| store)
    }

    fn encode_corpus(
        &self,
        corpus: &dyn Corpus,
        vocabularies: &VocabularySet,
    ) -> Result<(FeatureStore, usize)> {
        let extractors = self.build_extractors(vocabularies)?;
        info!(
            corpus = corpus.name(),
            extractors = extractors.len(),
            mode = ?self.config.feature_mode,
            "Starting encode pass"
        );

        let mut store = FeatureStore::new(self.config.learning_mode);
        let mut next_sequence = 0i64;
        let documents = self.for_each_batch(corpus, |batch| {
            let produced: Vec<DocumentInstances> = if self.config.parallel.enabled {
                batch
                    .par_iter()
                    .map(|doc| self.document_instances(&extractors, doc))
                    .collect::<Result<_>>()?
            } else {
                batch
                    .iter()
                    .map(|doc| self.document_instances(&extractors, doc))
                    .collect::<Result<_>>()?
            };
            for doc in produced {
                for instance in doc.instances {
                    let (local, position) = (instance.sequence_id(), instance.sequence_position());
                    let instance = if doc.sequences > 0 {
                        instance.with_sequence(next_sequence + local, position)
                    } else {
                        instance
                    };
                    store.add_instance(instance)?;
                }
                next_sequence += doc.sequences;
            }
            Ok(())
        })?;

        info!(
            documents,
            instances = store.len(),
            features = store.feature_names().len(),
            sparsity = store.sparsity_ratio(),
            "Encode pass complete"
        );
        Ok((store, documents))
    }

    /// Meta pass, encode pass and all artifacts written to `out_dir`.
    pub fn run(&self, corpus: &dyn Corpus, out_dir: &Path) -> Result<RunSummary> {
        std::fs::create_dir_all(out_dir)?;
        let vocabularies = self.run_meta_pass(corpus)?;
        vocabularies.save(&out_dir.join(VOCABULARY_DIR))?;

        let (store, documents) = self.encode_corpus(corpus, &vocabularies)?;
        if store.is_empty() {
            return Err(TcError::contract(format!(
                "corpus '{}' produced no instances",
                corpus.name()
            )));
        }
        self.write_store(&store, out_dir)?;

        let format = self.config.output.format;
        let mut state = EncoderState::new(format.uses_bias());
        let encoding = encode::write_encoded(format, &store, &mut state, out_dir)?;

        Ok(RunSummary {
            documents,
            instances: store.len(),
            vocabularies: vocabularies
                .names()
                .filter_map(|n| vocabularies.get(n).map(|v| (n.to_string(), v.len())))
                .collect(),
            features: encoding.features,
            labels: encoding.labels,
            sparsity: store.sparsity_ratio(),
            data_file: encoding.data_file,
        })
    }

    /// Encode held-out data against the artifacts of a previous [`Self::run`].
    ///
    /// Vocabularies, feature index and label mapping come from `train_dir`;
    /// features unknown to training are removed and unknown labels fail.
    pub fn apply(
        &self,
        corpus: &dyn Corpus,
        train_dir: &Path,
        out_dir: &Path,
    ) -> Result<EncodingSummary> {
        let vocabularies = VocabularySet::load(&train_dir.join(VOCABULARY_DIR))?;
        let index = StableIndex::load(&train_dir.join(FEATURE_INDEX_FILE))?;
        let labels_path = train_dir.join(LABEL_MAPPING_FILE);
        let labels = if labels_path.is_file() {
            Some(LabelMapping::load(&labels_path)?)
        } else {
            None
        };

        let mut store = self.run_encode_pass(corpus, &vocabularies)?;
        let training_names: BTreeSet<String> =
            index.features().map(|(name, _)| name.to_string()).collect();
        let removed = store.restrict_feature_names(&training_names)?;
        debug!(removed, "Removed feature values unknown to training");

        std::fs::create_dir_all(out_dir)?;
        self.write_store(&store, out_dir)?;
        let mut state = EncoderState::frozen(index, labels);
        encode::write_encoded(self.config.output.format, &store, &mut state, out_dir)
    }

    fn write_store(&self, store: &FeatureStore, out_dir: &Path) -> Result<()> {
        if self.config.output.write_feature_store {
            store.write_jsonl(&out_dir.join(FEATURE_STORE_FILE))?;
        }
        Ok(())
    }
}

fn missing_second_view(document: &Document) -> TcError {
    TcError::document(&document.id, "pair mode requires a second text")
}
