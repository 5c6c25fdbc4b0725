//! Subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tcfeat_core::config::{
    load_config, load_config_file, workspace_config_path, write_workspace_config,
};
use tcfeat_core::encode::outcome::ID2OUTCOME_FILE;
use tcfeat_core::encode::{EncodingSummary, LABEL_MAPPING_FILE};
use tcfeat_core::pipeline::{FEATURE_STORE_FILE, RunSummary, VOCABULARY_DIR};
use tcfeat_core::{
    DataFormat, FeatureStore, Id2Outcome, JsonlCorpus, LabelMapping, LearningMode, Pipeline,
    TcConfig,
};

/// Global options that adjust the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub config_file: Option<PathBuf>,
    pub format: Option<DataFormat>,
    pub out: Option<PathBuf>,
    pub sequential: bool,
}

impl Settings {
    /// Load the configuration and apply command-line overrides.
    pub fn resolve(&self, workspace: &Path) -> anyhow::Result<TcConfig> {
        let mut config = match &self.config_file {
            Some(path) => load_config_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?,
        };
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(out) = &self.out {
            config.output.dir = out.clone();
        }
        if self.sequential {
            config.parallel.enabled = false;
        }
        if config.output.dir.is_relative() {
            config.output.dir = workspace.join(&config.output.dir);
        }
        tracing::debug!(
            format = %config.output.format,
            out = %config.output.dir.display(),
            extractors = config.extractors.len(),
            "Resolved configuration"
        );
        Ok(config)
    }
}

/// Handle a CLI subcommand.
pub fn handle_command(
    command: Commands,
    workspace: &Path,
    settings: &Settings,
) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, workspace, settings),
        Commands::Vocab { corpus } => handle_vocab(&corpus, settings.resolve(workspace)?),
        Commands::Run { corpus, test, json } => {
            handle_run(&corpus, test.as_deref(), json, settings.resolve(workspace)?)
        }
        Commands::Apply { corpus, train_dir } => {
            let config = settings.resolve(workspace)?;
            let out = config.output.dir.clone();
            let pipeline = Pipeline::new(config)?;
            let corpus = open_corpus(&corpus)?;
            let summary = pipeline.apply(&corpus, &train_dir, &out)?;
            print_encoding(&summary);
            Ok(())
        }
        Commands::Id2outcome {
            predictions,
            data_dir,
            labels_dir,
            threshold,
        } => handle_id2outcome(
            &predictions,
            &data_dir,
            labels_dir.as_deref(),
            threshold,
            settings.resolve(workspace)?.learning_mode,
        ),
    }
}

fn open_corpus(path: &Path) -> anyhow::Result<JsonlCorpus> {
    JsonlCorpus::open(path).with_context(|| format!("Failed to open corpus {}", path.display()))
}

fn handle_config(action: ConfigAction, workspace: &Path, settings: &Settings) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            let config_path = write_workspace_config(workspace, &TcConfig::default())
                .with_context(|| format!("Failed to write {}", config_path.display()))?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = settings.resolve(workspace)?;
            config.validate()?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

fn handle_vocab(corpus: &Path, config: TcConfig) -> anyhow::Result<()> {
    let dir = config.output.dir.join(VOCABULARY_DIR);
    let pipeline = Pipeline::new(config)?;
    let corpus = open_corpus(corpus)?;
    let vocabularies = pipeline.run_meta_pass(&corpus)?;
    let manifest = vocabularies.save(&dir)?;

    println!("Vocabularies written to {}", dir.display());
    for entry in &manifest.vocabularies {
        println!(
            "  {:<20} {:>6} terms  (top_k {}, {} distinct)",
            entry.name, entry.size, entry.stats.top_k, entry.stats.distinct_terms
        );
    }
    Ok(())
}

fn handle_run(
    corpus: &Path,
    test: Option<&Path>,
    json: bool,
    config: TcConfig,
) -> anyhow::Result<()> {
    let out = config.output.dir.clone();
    let pipeline = Pipeline::new(config)?;
    let train_corpus = open_corpus(corpus)?;

    let train_dir = if test.is_some() { out.join("train") } else { out.clone() };
    let summary = pipeline.run(&train_corpus, &train_dir)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_run(&summary);
    }

    if let Some(test) = test {
        let test_corpus = open_corpus(test)?;
        let encoding = pipeline.apply(&test_corpus, &train_dir, &out.join("test"))?;
        print_encoding(&encoding);
    }
    Ok(())
}

fn print_run(summary: &RunSummary) {
    println!(
        "Encoded {} instances from {} documents",
        summary.instances, summary.documents
    );
    for (name, size) in &summary.vocabularies {
        println!("  vocabulary {:<20} {:>6} terms", name, size);
    }
    println!(
        "  {} features, {} labels, sparsity {:.4}",
        summary.features, summary.labels, summary.sparsity
    );
    println!("  data: {}", summary.data_file.display());
}

fn print_encoding(summary: &EncodingSummary) {
    println!(
        "Encoded {} rows ({} features, {} labels) to {}",
        summary.rows,
        summary.features,
        summary.labels,
        summary.data_file.display()
    );
    if summary.missing_as_zero > 0 {
        println!("  {} missing values written as 0", summary.missing_as_zero);
    }
}

fn handle_id2outcome(
    predictions: &Path,
    data_dir: &Path,
    labels_dir: Option<&Path>,
    threshold: f64,
    learning_mode: LearningMode,
) -> anyhow::Result<()> {
    let store_path = data_dir.join(FEATURE_STORE_FILE);
    let store = FeatureStore::read_jsonl(&store_path, learning_mode)
        .with_context(|| format!("Failed to read feature store {}", store_path.display()))?;

    let labels = if learning_mode == LearningMode::Regression {
        None
    } else {
        let path = labels_dir.unwrap_or(data_dir).join(LABEL_MAPPING_FILE);
        Some(
            LabelMapping::load(&path)
                .with_context(|| format!("Failed to read label mapping {}", path.display()))?,
        )
    };

    let text = std::fs::read_to_string(predictions)
        .with_context(|| format!("Failed to read predictions {}", predictions.display()))?;
    let report = Id2Outcome::from_predictions(&store, labels.as_ref(), &text, threshold)?;
    let target = data_dir.join(ID2OUTCOME_FILE);
    report.save(&target)?;

    println!("Wrote {} predictions to {}", report.rows.len(), target.display());
    if let Some(agreement) = report.agreement() {
        println!("  agreement {:.4}", agreement);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_settings_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            format: Some(DataFormat::Libsvm),
            out: Some(PathBuf::from("encoded")),
            sequential: true,
            ..Default::default()
        };
        let config = settings.resolve(dir.path()).unwrap();
        assert_eq!(config.output.format, DataFormat::Libsvm);
        assert_eq!(config.output.dir, dir.path().join("encoded"));
        assert!(!config.parallel.enabled);
    }

    #[test]
    fn test_config_init_writes_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        handle_config(ConfigAction::Init, dir.path(), &Settings::default()).unwrap();
        let path = workspace_config_path(dir.path());
        let loaded = load_config_file(&path).unwrap();
        assert_eq!(loaded, TcConfig::default());
    }

    #[test]
    fn test_run_then_id2outcome() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("train.jsonl");
        std::fs::write(
            &corpus,
            concat!(
                r#"{"id":"a","sentences":[{"tokens":["good","film"]}],"outcomes":["pos"]}"#,
                "\n",
                r#"{"id":"b","sentences":[{"tokens":["bad","film"]}],"outcomes":["neg"]}"#,
                "\n"
            ),
        )
        .unwrap();
        let settings = Settings {
            out: Some(dir.path().join("out")),
            ..Default::default()
        };
        let config = settings.resolve(dir.path()).unwrap();
        handle_run(&corpus, None, false, config).unwrap();

        let predictions = dir.path().join("predictions.txt");
        std::fs::write(&predictions, "1\n0\n").unwrap();
        let out = dir.path().join("out");
        handle_id2outcome(&predictions, &out, None, 0.5, LearningMode::SingleLabel).unwrap();
        let report = Id2Outcome::load(&out.join(ID2OUTCOME_FILE)).unwrap();
        assert_eq!(report.agreement(), Some(1.0));
    }
}
