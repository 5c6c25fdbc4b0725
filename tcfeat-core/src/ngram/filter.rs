//! Token normalization and stop-word filtering applied before counting.

use crate::error::Result;
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;

/// Lower-case a token string when requested, borrowing otherwise.
pub fn normalize(text: &str, lower_case: bool) -> Cow<'_, str> {
    if lower_case && text.chars().any(char::is_uppercase) {
        Cow::Owned(text.to_lowercase())
    } else {
        Cow::Borrowed(text)
    }
}

/// Stop-word filter over n-grams.
///
/// With `partial` set, an n-gram is rejected when any of its tokens is a stop
/// word. Otherwise only n-grams made up entirely of stop words are rejected.
#[derive(Debug, Clone, Default)]
pub struct StopwordFilter {
    words: HashSet<String>,
    partial: bool,
}

impl StopwordFilter {
    pub fn new<S: AsRef<str>>(words: impl IntoIterator<Item = S>, partial: bool) -> Self {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
            partial,
        }
    }

    /// Read one stop word per line; `#` starts a comment line.
    pub fn load(path: &Path, partial: bool) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let words = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));
        Ok(Self::new(words, partial))
    }

    /// Merge another word list into this filter.
    pub fn extend<S: AsRef<str>>(&mut self, words: impl IntoIterator<Item = S>) {
        self.words
            .extend(words.into_iter().map(|w| w.as_ref().trim().to_lowercase()));
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn is_stopword(&self, token: &str) -> bool {
        if self.words.contains(token) {
            return true;
        }
        token.chars().any(char::is_uppercase) && self.words.contains(&token.to_lowercase())
    }

    /// Whether an n-gram survives the filter.
    pub fn passes<S: AsRef<str>>(&self, gram: &[S]) -> bool {
        if self.words.is_empty() {
            return true;
        }
        if self.partial {
            !gram.iter().any(|t| self.is_stopword(t.as_ref()))
        } else {
            !gram.iter().all(|t| self.is_stopword(t.as_ref()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_borrows_when_unchanged() {
        assert!(matches!(normalize("plain", true), Cow::Borrowed(_)));
        assert!(matches!(normalize("Mixed", false), Cow::Borrowed(_)));
        assert_eq!(normalize("Mixed", true), "mixed");
    }

    #[test]
    fn test_partial_match_rejects_any_stopword() {
        let filter = StopwordFilter::new(["the", "a"], true);
        assert!(!filter.passes(&["the", "cat"]));
        assert!(filter.passes(&["black", "cat"]));
    }

    #[test]
    fn test_full_match_rejects_only_all_stopwords() {
        let filter = StopwordFilter::new(["the", "a"], false);
        assert!(filter.passes(&["the", "cat"]));
        assert!(!filter.passes(&["The", "a"]));
    }

    #[test]
    fn test_empty_filter_passes_everything() {
        let filter = StopwordFilter::default();
        assert!(filter.passes(&["the"]));
    }

    #[test]
    fn test_load_skips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stop.txt");
        std::fs::write(&path, "# english\nthe\n\nof\n").unwrap();
        let filter = StopwordFilter::load(&path, true).unwrap();
        assert!(!filter.passes(&["of"]));
        assert!(filter.passes(&["english"]));
    }
}
