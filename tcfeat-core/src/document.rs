//! Immutable document value objects handed to generators and extractors.
//!
//! A [`Document`] owns its tokens; extraction works on borrowed [`View`]s
//! (one slice of tokens per sentence) so a unit or a second pair view can be
//! processed without copying.

use crate::error::{Result, TcError};
use serde::{Deserialize, Serialize};

/// A single token with optional linguistic annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TokenRecord")]
pub struct Token {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
}

/// Tokens may be written either as bare strings or as annotated objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum TokenRecord {
    Text(String),
    Annotated {
        text: String,
        #[serde(default)]
        pos: Option<String>,
        #[serde(default)]
        phonetic: Option<String>,
    },
}

impl From<TokenRecord> for Token {
    fn from(record: TokenRecord) -> Self {
        match record {
            TokenRecord::Text(text) => Token::new(text),
            TokenRecord::Annotated {
                text,
                pos,
                phonetic,
            } => Token {
                text,
                pos,
                phonetic,
            },
        }
    }
}

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pos: None,
            phonetic: None,
        }
    }

    pub fn with_pos(mut self, pos: impl Into<String>) -> Self {
        self.pos = Some(pos.into());
        self
    }
}

/// A sentence: an ordered run of tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    pub tokens: Vec<Token>,
}

impl Sentence {
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
        Self {
            tokens: words.iter().map(|w| Token::new(w.as_ref())).collect(),
        }
    }
}

/// A classification unit inside a document: tokens `[begin, end)` of one sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpan {
    pub sentence: usize,
    pub begin: usize,
    pub end: usize,
    #[serde(default)]
    pub outcomes: Vec<String>,
}

fn default_weight() -> f64 {
    1.0
}

/// An annotated document as produced by the upstream annotation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub sentences: Vec<Sentence>,
    #[serde(default)]
    pub outcomes: Vec<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<UnitSpan>,
    /// Second text of a document pair.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_view: Option<Vec<Sentence>>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            language: None,
            sentences: Vec::new(),
            outcomes: Vec::new(),
            weight: default_weight(),
            units: Vec::new(),
            second_view: None,
        }
    }

    /// Build a document from pre-split sentences of plain words.
    pub fn from_words<S: AsRef<str>>(id: impl Into<String>, sentences: &[&[S]]) -> Self {
        let mut doc = Self::new(id);
        doc.sentences = sentences.iter().map(|s| Sentence::from_words(s)).collect();
        doc
    }

    pub fn with_outcomes<S: Into<String>>(mut self, outcomes: impl IntoIterator<Item = S>) -> Self {
        self.outcomes = outcomes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_second_view(mut self, sentences: Vec<Sentence>) -> Self {
        self.second_view = Some(sentences);
        self
    }

    /// The whole first text.
    pub fn view(&self) -> View<'_> {
        View {
            sentences: self.sentences.iter().map(|s| s.tokens.as_slice()).collect(),
            language: self.language.as_deref(),
        }
    }

    /// The second text, if this document is a pair.
    pub fn second(&self) -> Option<View<'_>> {
        self.second_view.as_ref().map(|sentences| View {
            sentences: sentences.iter().map(|s| s.tokens.as_slice()).collect(),
            language: self.language.as_deref(),
        })
    }

    /// The tokens covered by one unit span.
    pub fn unit_view(&self, unit: &UnitSpan) -> Result<View<'_>> {
        let sentence = self.sentences.get(unit.sentence).ok_or_else(|| {
            TcError::document(
                &self.id,
                format!("unit refers to sentence {} of {}", unit.sentence, self.sentences.len()),
            )
        })?;
        if unit.begin > unit.end || unit.end > sentence.tokens.len() {
            return Err(TcError::document(
                &self.id,
                format!(
                    "unit span [{}, {}) outside sentence of {} tokens",
                    unit.begin,
                    unit.end,
                    sentence.tokens.len()
                ),
            ));
        }
        Ok(View {
            sentences: vec![&sentence.tokens[unit.begin..unit.end]],
            language: self.language.as_deref(),
        })
    }

    pub fn token_count(&self) -> usize {
        self.sentences.iter().map(|s| s.tokens.len()).sum()
    }
}

/// Borrowed token structure seen by generators and extractors.
#[derive(Debug, Clone)]
pub struct View<'a> {
    pub sentences: Vec<&'a [Token]>,
    pub language: Option<&'a str>,
}

impl<'a> View<'a> {
    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    pub fn token_count(&self) -> usize {
        self.sentences.iter().map(|s| s.len()).sum()
    }

    /// All tokens across sentence boundaries.
    pub fn tokens(&self) -> impl Iterator<Item = &'a Token> + '_ {
        self.sentences.iter().flat_map(|s| s.iter())
    }
}
