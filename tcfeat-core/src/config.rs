//! Configuration for vocabulary building, extraction and output.
//!
//! Settings are loaded in layers with figment:
//! built-in defaults, then the user config file, then `.tcfeat/config.toml`
//! in the workspace, then `TCFEAT_` environment variables, then explicit
//! overrides. [`TcConfig::validate`] must pass before a pipeline is built.

use crate::encode::format::DataFormat;
use crate::error::{Result, TcError};
use crate::features::store::{FeatureMode, LearningMode};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Which token strings feed an n-gram generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NGramSource {
    #[default]
    Word,
    Character,
    PartOfSpeech,
    Phonetic,
    Keyword(KeywordOptions),
}

impl NGramSource {
    /// String placed between the elements of one n-gram.
    pub fn glue(&self) -> &'static str {
        match self {
            Self::Character => "",
            _ => "_",
        }
    }

    fn default_prefix(&self) -> &'static str {
        match self {
            Self::Word => "ngram",
            Self::Character => "charngram",
            Self::PartOfSpeech => "posngram",
            Self::Phonetic => "phoneticngram",
            Self::Keyword(_) => "keyNG",
        }
    }
}

/// Keyword list and marker settings for keyword n-grams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordOptions {
    #[serde(default)]
    pub keywords: Vec<String>,
    /// One keyword per line; merged with `keywords`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords_file: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub mark_sentence_boundary: bool,
    #[serde(default)]
    pub mark_sentence_location: bool,
    #[serde(default)]
    pub include_commas: bool,
}

/// How a vocabulary term's presence in a unit becomes a feature value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueMode {
    /// 1 when the term occurs.
    #[default]
    Binary,
    /// Number of occurrences in the unit.
    Count,
}

/// Settings for one vocabulary-backed n-gram extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NGramConfig {
    /// Vocabulary key; also the feature-name prefix unless `prefix` is set.
    pub name: String,
    #[serde(default)]
    pub source: NGramSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default = "default_min_n")]
    pub min_n: usize,
    #[serde(default = "default_max_n")]
    pub max_n: usize,
    #[serde(default)]
    pub skip: usize,
    /// Vocabulary size. Required.
    #[serde(default)]
    pub top_k: Option<usize>,
    /// Terms seen fewer times than this are dropped before top-K selection.
    #[serde(default = "default_min_count")]
    pub min_count: u64,
    /// Terms shorter than this many characters are dropped before top-K selection.
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,
    #[serde(default = "default_true")]
    pub lower_case: bool,
    #[serde(default)]
    pub stopwords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopwords_file: Option<PathBuf>,
    #[serde(default)]
    pub filter_partial_matches: bool,
    #[serde(default)]
    pub value_mode: ValueMode,
}

fn default_true() -> bool {
    true
}

fn default_min_n() -> usize {
    1
}

fn default_max_n() -> usize {
    3
}

fn default_min_count() -> u64 {
    1
}

fn default_min_token_length() -> usize {
    1
}

fn default_top_k() -> usize {
    500
}

impl NGramConfig {
    pub fn new(name: impl Into<String>, source: NGramSource) -> Self {
        Self {
            name: name.into(),
            source,
            prefix: None,
            min_n: default_min_n(),
            max_n: default_max_n(),
            skip: 0,
            top_k: Some(default_top_k()),
            min_count: default_min_count(),
            min_token_length: default_min_token_length(),
            lower_case: true,
            stopwords: Vec::new(),
            stopwords_file: None,
            filter_partial_matches: false,
            value_mode: ValueMode::default(),
        }
    }

    pub fn with_range(mut self, min_n: usize, max_n: usize) -> Self {
        self.min_n = min_n;
        self.max_n = max_n;
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_value_mode(mut self, mode: ValueMode) -> Self {
        self.value_mode = mode;
        self
    }

    /// Feature-name prefix without the trailing separator.
    pub fn feature_prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(&self.name)
    }

    /// Validated vocabulary size.
    pub fn vocabulary_size(&self) -> Result<usize> {
        self.top_k.ok_or_else(|| {
            TcError::config(format!("extractor '{}': vocabulary size (top_k) is not set", self.name))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TcError::config("n-gram extractor name must not be empty"));
        }
        // the name doubles as the vocabulary file stem
        if !self
            .name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Err(TcError::config(format!(
                "extractor '{}': name may only contain letters, digits, '_' and '-'",
                self.name
            )));
        }
        self.vocabulary_size()?;
        if self.min_n == 0 {
            return Err(TcError::config(format!(
                "extractor '{}': min_n must be at least 1",
                self.name
            )));
        }
        if self.min_n > self.max_n {
            return Err(TcError::config(format!(
                "extractor '{}': min_n ({}) exceeds max_n ({})",
                self.name, self.min_n, self.max_n
            )));
        }
        if self.min_token_length == 0 {
            return Err(TcError::config(format!(
                "extractor '{}': min_token_length must be at least 1",
                self.name
            )));
        }
        if let NGramSource::Keyword(options) = &self.source {
            if options.keywords.is_empty() && options.keywords_file.is_none() {
                return Err(TcError::config(format!(
                    "extractor '{}': keyword n-grams need keywords or keywords_file",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for NGramConfig {
    fn default() -> Self {
        Self::new(NGramSource::Word.default_prefix(), NGramSource::Word)
    }
}

/// Vocabulary-free scalar features of one text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarFeature {
    NrOfTokens,
    NrOfSentences,
    TokensPerSentence,
    AvgTokenLength,
    TypeTokenRatio,
}

/// Features comparing the two texts of a document pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairFeature {
    TokenRatio,
    TokenDifference,
}

/// One configured extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractorConfig {
    Ngram(NGramConfig),
    Scalar { feature: ScalarFeature },
    Pair { feature: PairFeature },
}

impl ExtractorConfig {
    /// Name used for duplicate detection and logging.
    pub fn name(&self) -> String {
        match self {
            Self::Ngram(config) => config.name.clone(),
            Self::Scalar { feature } => format!("{feature:?}"),
            Self::Pair { feature } => format!("{feature:?}"),
        }
    }
}

/// Where and how results are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub format: DataFormat,
    /// Also write the line-delimited feature store next to the data file.
    #[serde(default = "default_true")]
    pub write_feature_store: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("tcfeat-out")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: DataFormat::default(),
            write_feature_store: true,
        }
    }
}

/// Data-parallel execution of both passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Documents processed per parallel batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    256
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: default_batch_size(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcConfig {
    #[serde(default)]
    pub feature_mode: FeatureMode,
    #[serde(default)]
    pub learning_mode: LearningMode,
    #[serde(default = "default_extractors")]
    pub extractors: Vec<ExtractorConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub parallel: ParallelConfig,
}

fn default_extractors() -> Vec<ExtractorConfig> {
    vec![
        ExtractorConfig::Ngram(NGramConfig::default()),
        ExtractorConfig::Scalar {
            feature: ScalarFeature::NrOfTokens,
        },
    ]
}

impl Default for TcConfig {
    fn default() -> Self {
        Self {
            feature_mode: FeatureMode::default(),
            learning_mode: LearningMode::default(),
            extractors: default_extractors(),
            output: OutputConfig::default(),
            parallel: ParallelConfig::default(),
        }
    }
}

impl TcConfig {
    /// The n-gram extractors, in configuration order.
    pub fn ngram_configs(&self) -> impl Iterator<Item = &NGramConfig> {
        self.extractors.iter().filter_map(|e| match e {
            ExtractorConfig::Ngram(config) => Some(config),
            _ => None,
        })
    }

    /// Check every setting that can be checked without reading the corpus.
    pub fn validate(&self) -> Result<()> {
        if self.extractors.is_empty() {
            return Err(TcError::config("at least one extractor must be configured"));
        }
        let mut names = HashSet::new();
        for extractor in &self.extractors {
            let name = extractor.name();
            if !names.insert(name.clone()) {
                return Err(TcError::config(format!("duplicate extractor '{name}'")));
            }
            match extractor {
                ExtractorConfig::Ngram(config) => config.validate()?,
                ExtractorConfig::Pair { .. } if self.feature_mode != FeatureMode::Pair => {
                    return Err(TcError::config(format!(
                        "pair extractor '{name}' requires feature_mode = \"pair\""
                    )));
                }
                _ => {}
            }
        }
        if self.parallel.batch_size == 0 {
            return Err(TcError::config("parallel.batch_size must be at least 1"));
        }
        self.output
            .format
            .check_modes(self.feature_mode, self.learning_mode)?;
        Ok(())
    }
}

/// Path of the workspace-level configuration file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".tcfeat").join("config.toml")
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "tcfeat", "tcfeat")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from all layers.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&TcConfig>,
) -> std::result::Result<TcConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(TcConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // TCFEAT_OUTPUT__FORMAT=libsvm, TCFEAT_PARALLEL__ENABLED=false, ...
    figment = figment.merge(Env::prefixed("TCFEAT_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Load a single TOML file on top of the defaults.
pub fn load_config_file(path: &Path) -> Result<TcConfig> {
    Figment::from(Serialized::defaults(TcConfig::default()))
        .merge(Toml::file(path))
        .extract()
        .map_err(|e| TcError::config(e.to_string()))
}

/// Write `config` to the workspace configuration file.
///
/// The file is validated by parsing it back before it replaces any existing
/// file. Returns the path written.
pub fn write_workspace_config(workspace: &Path, config: &TcConfig) -> Result<PathBuf> {
    let path = workspace_config_path(workspace);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let toml_str = toml::to_string_pretty(config).map_err(|e| TcError::config(e.to_string()))?;
    let parsed: TcConfig = toml::from_str(&toml_str).map_err(|e| TcError::config(e.to_string()))?;
    parsed.validate()?;

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &toml_str)?;
    std::fs::rename(&tmp, &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TcConfig::default();
        config.validate().unwrap();
        assert_eq!(config.ngram_configs().count(), 1);
        assert_eq!(config.ngram_configs().next().unwrap().top_k, Some(500));
    }

    #[test]
    fn test_missing_top_k_rejected() {
        let mut ngram = NGramConfig::default();
        ngram.top_k = None;
        let err = ngram.validate().unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn test_min_token_length_defaults_and_validates() {
        let mut ngram = NGramConfig::default();
        assert_eq!(ngram.min_token_length, 1);
        ngram.min_token_length = 0;
        assert!(matches!(ngram.validate(), Err(TcError::Config(_))));
    }

    #[test]
    fn test_path_like_names_rejected() {
        for name in ["../escape", "a/b", "a\\b", ".hidden"] {
            let ngram = NGramConfig::new(name, NGramSource::Word);
            assert!(matches!(ngram.validate(), Err(TcError::Config(_))), "{name}");
        }
        assert!(NGramConfig::new("char-ngrams_2", NGramSource::Word).validate().is_ok());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let ngram = NGramConfig::default().with_range(3, 2);
        assert!(matches!(ngram.validate(), Err(TcError::Config(_))));
    }

    #[test]
    fn test_keyword_source_needs_keywords() {
        let ngram = NGramConfig::new("keyNG", NGramSource::Keyword(KeywordOptions::default()));
        assert!(ngram.validate().is_err());
    }

    #[test]
    fn test_duplicate_extractor_names_rejected() {
        let mut config = TcConfig::default();
        config
            .extractors
            .push(ExtractorConfig::Ngram(NGramConfig::default()));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate extractor"));
    }

    #[test]
    fn test_pair_extractor_requires_pair_mode() {
        let mut config = TcConfig::default();
        config.extractors.push(ExtractorConfig::Pair {
            feature: PairFeature::TokenRatio,
        });
        assert!(config.validate().is_err());
        config.feature_mode = FeatureMode::Pair;
        config.validate().unwrap();
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = TcConfig::default();
        config.parallel.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip_of_extractors() {
        let toml_str = r#"
            feature_mode = "document"

            [[extractors]]
            kind = "ngram"
            name = "chars"
            source = "character"
            min_n = 2
            max_n = 4
            top_k = 1000

            [[extractors]]
            kind = "ngram"
            name = "keyNG"
            top_k = 50
            max_n = 2
            source = { keyword = { keywords = ["cherry", "peach"], include_commas = true } }

            [[extractors]]
            kind = "scalar"
            feature = "tokens_per_sentence"
        "#;
        let config: TcConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.extractors.len(), 3);
        match &config.extractors[1] {
            ExtractorConfig::Ngram(ngram) => match &ngram.source {
                NGramSource::Keyword(options) => {
                    assert!(options.include_commas);
                    assert!(options.mark_sentence_boundary);
                }
                other => panic!("unexpected source {other:?}"),
            },
            other => panic!("unexpected extractor {other:?}"),
        }
        config.validate().unwrap();
    }

    #[test]
    fn test_load_config_file_merges_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[parallel]\nbatch_size = 8\n").unwrap();
        let config = load_config_file(&path).unwrap();
        assert_eq!(config.parallel.batch_size, 8);
        assert!(config.parallel.enabled);
        assert_eq!(config.extractors.len(), 2);
    }

    #[test]
    fn test_load_config_reads_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = workspace_config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "learning_mode = \"regression\"\n").unwrap();
        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.learning_mode, LearningMode::Regression);
    }

    #[test]
    fn test_written_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TcConfig::default();
        config.output.format = DataFormat::Arff;
        let path = write_workspace_config(dir.path(), &config).unwrap();
        assert_eq!(path, workspace_config_path(dir.path()));
        assert_eq!(load_config_file(&path).unwrap(), config);
    }
}
