//! Restartable corpus enumeration.
//!
//! Both passes traverse the same corpus, so every implementation must be able
//! to start over from the first document on each call to [`Corpus::documents`].

use crate::document::Document;
use crate::error::{Result, TcError};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Iterator over the documents of one traversal.
pub type DocumentIter<'a> = Box<dyn Iterator<Item = Result<Document>> + 'a>;

/// An ordered, restartable source of documents.
pub trait Corpus: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Start a fresh traversal.
    fn documents(&self) -> Result<DocumentIter<'_>>;
}

/// Corpus held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpus {
    name: String,
    documents: Vec<Document>,
}

impl InMemoryCorpus {
    pub fn new(name: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            name: name.into(),
            documents,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Corpus for InMemoryCorpus {
    fn name(&self) -> &str {
        &self.name
    }

    fn documents(&self) -> Result<DocumentIter<'_>> {
        Ok(Box::new(self.documents.iter().cloned().map(Ok)))
    }
}

/// Corpus stored as one JSON document per line.
#[derive(Debug, Clone)]
pub struct JsonlCorpus {
    path: PathBuf,
    name: String,
}

impl JsonlCorpus {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(TcError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("corpus file not found: {}", path.display()),
            )));
        }
        let name = path.display().to_string();
        Ok(Self { path, name })
    }
}

impl Corpus for JsonlCorpus {
    fn name(&self) -> &str {
        &self.name
    }

    fn documents(&self) -> Result<DocumentIter<'_>> {
        let reader = BufReader::new(std::fs::File::open(&self.path)?);
        let iter = reader
            .lines()
            .enumerate()
            .filter_map(move |(idx, line)| match line {
                Err(e) => Some(Err(TcError::from(e))),
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(
                    serde_json::from_str::<Document>(&line)
                        .map_err(|e| TcError::parse(&self.name, idx + 1, e.to_string())),
                ),
            });
        Ok(Box::new(iter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_in_memory_corpus_restarts() {
        let corpus = InMemoryCorpus::new(
            "mem",
            vec![Document::new("a"), Document::new("b")],
        );
        let first: Vec<String> = corpus
            .documents()
            .unwrap()
            .map(|d| d.unwrap().id)
            .collect();
        let second: Vec<String> = corpus
            .documents()
            .unwrap()
            .map(|d| d.unwrap().id)
            .collect();
        assert_eq!(first, vec!["a", "b"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_jsonl_corpus_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"id": "d1", "sentences": [{{"tokens": ["a"]}}]}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"id": "d2"}}"#).unwrap();
        let corpus = JsonlCorpus::open(file.path()).unwrap();
        let docs: Vec<Document> = corpus.documents().unwrap().map(|d| d.unwrap()).collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].id, "d2");
    }

    #[test]
    fn test_jsonl_corpus_reports_line_number() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"id": "d1"}}"#).unwrap();
        writeln!(file, "not json").unwrap();
        let corpus = JsonlCorpus::open(file.path()).unwrap();
        let results: Vec<Result<Document>> = corpus.documents().unwrap().collect();
        match &results[1] {
            Err(TcError::Parse { line, .. }) => assert_eq!(*line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_jsonl_corpus_missing_file() {
        assert!(JsonlCorpus::open("/definitely/not/here.jsonl").is_err());
    }
}
