//! Finalized vocabularies and their on-disk artifacts.
//!
//! Each vocabulary is written as `<name>.tsv` with one `term<TAB>rank` line per
//! term (rank starts at 1), ordered as selected. A `vocabularies.json`
//! manifest next to the files records sizes and a SHA-256 fingerprint per
//! vocabulary, checked again on load.

use crate::error::{Result, TcError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub const MANIFEST_FILE: &str = "vocabularies.json";

/// Counts observed while building a vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyStats {
    pub top_k: usize,
    /// Distinct candidate terms before selection.
    pub distinct_terms: usize,
    /// Candidate occurrences before selection.
    pub total_count: u64,
}

/// An immutable, ordered set of at most K terms for one feature type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    name: String,
    terms: Vec<String>,
    index: HashMap<String, usize>,
    stats: VocabularyStats,
}

impl Vocabulary {
    /// Build from already-selected terms, best first. Later duplicates are ignored.
    pub fn new(name: impl Into<String>, terms: Vec<String>, stats: VocabularyStats) -> Self {
        let mut index = HashMap::with_capacity(terms.len());
        let mut unique = Vec::with_capacity(terms.len());
        for term in terms {
            if !index.contains_key(&term) {
                index.insert(term.clone(), unique.len());
                unique.push(term);
            }
        }
        Self {
            name: name.into(),
            terms: unique,
            index,
            stats,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.index.contains_key(term)
    }

    /// 1-based rank of a term.
    pub fn rank(&self, term: &str) -> Option<usize> {
        self.index.get(term).map(|i| i + 1)
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    pub fn stats(&self) -> VocabularyStats {
        self.stats
    }

    /// SHA-256 over the ordered terms.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for term in &self.terms {
            hasher.update(term.as_bytes());
            hasher.update([b'\n']);
        }
        hasher
            .finalize()
            .iter()
            .fold(String::with_capacity(64), |mut out, b| {
                let _ = write!(out, "{b:02x}");
                out
            })
    }

    /// Render the `term<TAB>rank` artifact.
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for (i, term) in self.terms.iter().enumerate() {
            let _ = writeln!(out, "{}\t{}", escape_term(term), i + 1);
        }
        out
    }

    /// Parse a `term<TAB>rank` artifact. Ranks must run 1, 2, 3, ...
    pub fn from_tsv(name: impl Into<String>, content: &str, stats: VocabularyStats) -> Result<Self> {
        let name = name.into();
        let mut terms = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let (term, rank) = line.rsplit_once('\t').ok_or_else(|| {
                TcError::parse(&name, line_no + 1, "expected term<TAB>rank")
            })?;
            let rank: usize = rank
                .parse()
                .map_err(|_| TcError::parse(&name, line_no + 1, format!("invalid rank '{rank}'")))?;
            if rank != terms.len() + 1 {
                return Err(TcError::parse(
                    &name,
                    line_no + 1,
                    format!("rank {rank} out of sequence"),
                ));
            }
            terms.push(unescape_term(term));
        }
        Ok(Self::new(name, terms, stats))
    }
}

fn escape_term(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_term(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    let mut chars = term.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// One manifest row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub file: String,
    pub size: usize,
    pub fingerprint: String,
    #[serde(flatten)]
    pub stats: VocabularyStats,
}

/// Index of the vocabularies written by one meta pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyManifest {
    pub created_at: DateTime<Utc>,
    pub vocabularies: Vec<ManifestEntry>,
}

/// All finalized vocabularies of a run, keyed by feature-type name.
#[derive(Debug, Clone, Default)]
pub struct VocabularySet {
    vocabularies: BTreeMap<String, Arc<Vocabulary>>,
}

impl VocabularySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vocabulary; a second vocabulary under the same name is rejected.
    pub fn insert(&mut self, vocabulary: Vocabulary) -> Result<()> {
        let name = vocabulary.name().to_string();
        if self.vocabularies.contains_key(&name) {
            return Err(TcError::vocabulary_state(format!(
                "vocabulary '{name}' was already finalized"
            )));
        }
        self.vocabularies.insert(name, Arc::new(vocabulary));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Vocabulary>> {
        self.vocabularies.get(name).cloned()
    }

    /// The vocabulary for `name`, or a state error when it was never finalized.
    pub fn require(&self, name: &str) -> Result<Arc<Vocabulary>> {
        self.get(name).ok_or_else(|| {
            TcError::vocabulary_state(format!(
                "vocabulary '{name}' is not finalized; run the vocabulary pass first"
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.vocabularies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabularies.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vocabularies.keys().map(String::as_str)
    }

    /// File name of a vocabulary inside the output directory.
    fn file_name(name: &str) -> Result<String> {
        let safe = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
        if !safe {
            return Err(TcError::artifact(format!(
                "vocabulary name '{name}' cannot be used as a file name"
            )));
        }
        Ok(format!("{name}.tsv"))
    }

    fn write_atomic(path: &Path, content: &str) -> Result<()> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Write every vocabulary plus the manifest into `dir`.
    pub fn save(&self, dir: &Path) -> Result<VocabularyManifest> {
        std::fs::create_dir_all(dir)?;
        let mut entries = Vec::with_capacity(self.vocabularies.len());
        for (name, vocabulary) in &self.vocabularies {
            let file = Self::file_name(name)?;
            let path = dir.join(&file);
            Self::write_atomic(&path, &vocabulary.to_tsv())?;
            debug!(vocabulary = %name, path = %path.display(), size = vocabulary.len(), "Wrote vocabulary");
            entries.push(ManifestEntry {
                name: name.clone(),
                file,
                size: vocabulary.len(),
                fingerprint: vocabulary.fingerprint(),
                stats: vocabulary.stats(),
            });
        }
        let manifest = VocabularyManifest {
            created_at: Utc::now(),
            vocabularies: entries,
        };
        let manifest_path = dir.join(MANIFEST_FILE);
        Self::write_atomic(&manifest_path, &serde_json::to_string_pretty(&manifest)?)?;
        info!(dir = %dir.display(), count = self.len(), "Saved vocabularies");
        Ok(manifest)
    }

    /// Load the vocabularies listed in `dir`'s manifest, verifying fingerprints.
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(TcError::artifact(format!(
                "no vocabulary manifest at {}",
                manifest_path.display()
            )));
        }
        let manifest: VocabularyManifest =
            serde_json::from_str(&std::fs::read_to_string(&manifest_path)?)?;
        let mut set = Self::new();
        for entry in manifest.vocabularies {
            if entry.file != Self::file_name(&entry.name)? {
                return Err(TcError::artifact(format!(
                    "manifest entry '{}' points at unexpected file '{}'",
                    entry.name, entry.file
                )));
            }
            let content = std::fs::read_to_string(dir.join(&entry.file))?;
            let vocabulary = Vocabulary::from_tsv(&entry.name, &content, entry.stats)?;
            if vocabulary.fingerprint() != entry.fingerprint {
                return Err(TcError::artifact(format!(
                    "vocabulary '{}' does not match its manifest fingerprint",
                    entry.name
                )));
            }
            set.insert(vocabulary)?;
        }
        debug!(dir = %dir.display(), count = set.len(), "Loaded vocabularies");
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Vocabulary {
        Vocabulary::new(
            "ngram",
            vec!["peaches".into(), "are".into(), "tab\there".into()],
            VocabularyStats {
                top_k: 3,
                distinct_terms: 8,
                total_count: 33,
            },
        )
    }

    #[test]
    fn test_rank_is_one_based() {
        let vocab = sample();
        assert_eq!(vocab.rank("peaches"), Some(1));
        assert_eq!(vocab.rank("are"), Some(2));
        assert_eq!(vocab.rank("ripe"), None);
    }

    #[test]
    fn test_duplicate_terms_ignored() {
        let vocab = Vocabulary::new("v", vec!["a".into(), "a".into(), "b".into()], VocabularyStats::default());
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.rank("b"), Some(2));
    }

    #[test]
    fn test_tsv_escapes_tabs() {
        let vocab = sample();
        let tsv = vocab.to_tsv();
        assert_eq!(tsv, "peaches\t1\nare\t2\ntab\\there\t3\n");
        let parsed = Vocabulary::from_tsv("ngram", &tsv, vocab.stats()).unwrap();
        assert_eq!(parsed, vocab);
    }

    #[test]
    fn test_tsv_rejects_rank_gap() {
        let err = Vocabulary::from_tsv("v", "a\t1\nb\t3\n", VocabularyStats::default()).unwrap_err();
        assert!(matches!(err, TcError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_fingerprint_depends_on_order() {
        let a = Vocabulary::new("v", vec!["x".into(), "y".into()], VocabularyStats::default());
        let b = Vocabulary::new("v", vec!["y".into(), "x".into()], VocabularyStats::default());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_set_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = VocabularySet::new();
        set.insert(sample()).unwrap();
        let manifest = set.save(dir.path()).unwrap();
        assert_eq!(manifest.vocabularies[0].file, "ngram.tsv");

        let loaded = VocabularySet::load(dir.path()).unwrap();
        let vocab = loaded.require("ngram").unwrap();
        assert_eq!(*vocab, sample());
        assert_eq!(vocab.stats().distinct_terms, 8);
    }

    #[test]
    fn test_save_leaves_no_tmp_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = VocabularySet::new();
        set.insert(sample()).unwrap();
        set.save(dir.path()).unwrap();
        let mut files: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(files, vec![MANIFEST_FILE.to_string(), "ngram.tsv".to_string()]);
    }

    #[test]
    fn test_save_rejects_path_like_names() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("vocabularies");
        let mut set = VocabularySet::new();
        set.insert(Vocabulary::new("../escape", vec!["a".into()], VocabularyStats::default()))
            .unwrap();
        assert!(matches!(set.save(&dir), Err(TcError::Artifact(_))));
        assert!(!root.path().join("escape.tsv").exists());
    }

    #[test]
    fn test_load_detects_tampering() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = VocabularySet::new();
        set.insert(sample()).unwrap();
        set.save(dir.path()).unwrap();
        std::fs::write(dir.path().join("ngram.tsv"), "are\t1\npeaches\t2\n").unwrap();
        assert!(matches!(
            VocabularySet::load(dir.path()),
            Err(TcError::Artifact(_))
        ));
    }

    #[test]
    fn test_require_missing_is_state_error() {
        let set = VocabularySet::new();
        assert!(matches!(
            set.require("ngram"),
            Err(TcError::VocabularyState(_))
        ));
    }

    #[test]
    fn test_insert_twice_rejected() {
        let mut set = VocabularySet::new();
        set.insert(sample()).unwrap();
        assert!(set.insert(sample()).is_err());
    }
}
