//! Error types for the tcfeat-core crate.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TcError>;

/// Top-level error type for vocabulary building, extraction and encoding.
#[derive(Debug, Error)]
pub enum TcError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Vocabulary state error: {0}")]
    VocabularyState(String),

    #[error("Contract violation: {0}")]
    Contract(String),

    #[error("Label mismatch: outcome '{label}' is not in the label mapping")]
    LabelMismatch { label: String },

    #[error("Document error in '{id}': {message}")]
    Document { id: String, message: String },

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("Parse error at {source_name}:{line}: {message}")]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TcError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn vocabulary_state(msg: impl Into<String>) -> Self {
        Self::VocabularyState(msg.into())
    }

    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }

    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact(msg.into())
    }

    pub fn document(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Document {
            id: id.into(),
            message: message.into(),
        }
    }

    pub fn parse(source_name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            line,
            message: message.into(),
        }
    }
}
