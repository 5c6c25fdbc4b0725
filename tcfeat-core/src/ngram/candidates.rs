//! Candidate term generation for one n-gram extractor.
//!
//! The vocabulary builder and the feature extractor both call
//! [`CandidateGenerator::candidates`], so a term counted in the first pass is
//! generated in exactly the same form in the second.

use crate::config::{NGramConfig, NGramSource};
use crate::document::View;
use crate::error::{Result, TcError};
use crate::ngram::filter::{StopwordFilter, normalize};
use crate::ngram::keyword::KeywordMatcher;
use crate::ngram::phonetic::PhoneticEncoder;
use crate::ngram::skip::SkipGrams;
use crate::ngram::{WORD_BEGIN, WORD_END};
use crate::stats::FrequencyDistribution;
use std::path::Path;

#[derive(Debug, Clone)]
enum Source {
    Word { stopwords: StopwordFilter },
    Character,
    PartOfSpeech,
    Phonetic,
    Keyword { matcher: KeywordMatcher },
}

/// Turns a view into the multiset of candidate terms for one extractor.
#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    source: Source,
    min_n: usize,
    max_n: usize,
    skip: usize,
    lower_case: bool,
    glue: &'static str,
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        TcError::config(format!("cannot read word list {}: {e}", path.display()))
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

impl CandidateGenerator {
    /// Validate the configuration and load any word lists it names.
    pub fn from_config(config: &NGramConfig) -> Result<Self> {
        config.validate()?;
        let source = match &config.source {
            NGramSource::Word => {
                let mut stopwords =
                    StopwordFilter::new(&config.stopwords, config.filter_partial_matches);
                if let Some(path) = &config.stopwords_file {
                    stopwords.extend(read_lines(path)?);
                }
                Source::Word { stopwords }
            }
            NGramSource::Character => Source::Character,
            NGramSource::PartOfSpeech => Source::PartOfSpeech,
            NGramSource::Phonetic => Source::Phonetic,
            NGramSource::Keyword(options) => {
                let mut keywords = options.keywords.clone();
                if let Some(path) = &options.keywords_file {
                    keywords.extend(read_lines(path)?);
                }
                let matcher = KeywordMatcher::new(keywords)
                    .with_sentence_boundary(options.mark_sentence_boundary)
                    .with_sentence_location(options.mark_sentence_location)
                    .with_commas(options.include_commas);
                Source::Keyword { matcher }
            }
        };
        Ok(Self {
            source,
            min_n: config.min_n,
            max_n: config.max_n,
            skip: config.skip,
            lower_case: config.lower_case,
            glue: config.source.glue(),
        })
    }

    fn count_grams<S: AsRef<str>>(
        &self,
        items: &[S],
        stopwords: Option<&StopwordFilter>,
        dist: &mut FrequencyDistribution,
    ) -> Result<()> {
        let generator = SkipGrams::new(items, self.min_n, self.max_n, self.skip)?;
        for gram in generator.iter() {
            let parts: Vec<&str> = gram.iter().map(|s| s.as_ref()).collect();
            if let Some(filter) = stopwords {
                if !filter.passes(&parts) {
                    continue;
                }
            }
            dist.inc(&parts.join(self.glue));
        }
        Ok(())
    }

    fn phonetic_encoder(view: &View<'_>, document_id: &str) -> Result<PhoneticEncoder> {
        let language = view.language.ok_or_else(|| {
            TcError::document(document_id, "phonetic n-grams need a document language")
        })?;
        PhoneticEncoder::for_language(language)
            .map_err(|e| TcError::document(document_id, e.to_string()))
    }

    /// Every candidate occurrence in the view, counted with multiplicity.
    ///
    /// `document_id` only labels errors.
    pub fn candidates(&self, view: &View<'_>, document_id: &str) -> Result<FrequencyDistribution> {
        let mut dist = FrequencyDistribution::new();
        match &self.source {
            Source::Word { stopwords } => {
                let filter = (!stopwords.is_empty()).then_some(stopwords);
                for sentence in &view.sentences {
                    let words: Vec<_> = sentence
                        .iter()
                        .map(|t| normalize(&t.text, self.lower_case))
                        .collect();
                    self.count_grams(&words, filter, &mut dist)?;
                }
            }
            Source::Character => {
                for token in view.tokens() {
                    let text = normalize(&token.text, self.lower_case);
                    let chars: Vec<String> = std::iter::once(WORD_BEGIN)
                        .chain(text.chars())
                        .chain(std::iter::once(WORD_END))
                        .map(String::from)
                        .collect();
                    self.count_grams(&chars, None, &mut dist)?;
                }
            }
            Source::PartOfSpeech => {
                for sentence in &view.sentences {
                    let tags: Vec<&str> = sentence.iter().filter_map(|t| t.pos.as_deref()).collect();
                    self.count_grams(&tags, None, &mut dist)?;
                }
            }
            Source::Phonetic => {
                let mut resolved: Option<PhoneticEncoder> = None;
                for sentence in &view.sentences {
                    let mut codes = Vec::with_capacity(sentence.len());
                    for token in sentence.iter() {
                        let code = match &token.phonetic {
                            Some(code) => code.clone(),
                            None => {
                                let encoder = match resolved {
                                    Some(encoder) => encoder,
                                    None => *resolved
                                        .insert(Self::phonetic_encoder(view, document_id)?),
                                };
                                encoder.encode(&token.text)
                            }
                        };
                        if !code.is_empty() {
                            codes.push(code);
                        }
                    }
                    self.count_grams(&codes, None, &mut dist)?;
                }
            }
            Source::Keyword { matcher } => {
                let sequence = matcher.sequence(view);
                self.count_grams(&sequence, None, &mut dist)?;
            }
        }
        Ok(dist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeywordOptions;
    use crate::document::{Document, Sentence, Token};

    fn example() -> Document {
        Document::from_words(
            "ex",
            &[
                &["The", "cat", "sat", "."][..],
                &["The", "dog", "sat", "."][..],
            ],
        )
    }

    #[test]
    fn test_word_ngrams_do_not_cross_sentences() {
        let config = NGramConfig::new("ngram", NGramSource::Word).with_range(2, 2);
        let generator = CandidateGenerator::from_config(&config).unwrap();
        let dist = generator.candidates(&example().view(), "ex").unwrap();
        assert_eq!(dist.count("the_cat"), 1);
        assert_eq!(dist.count("sat_."), 2);
        assert_eq!(dist.count("._the"), 0);
        assert_eq!(dist.total(), 6);
    }

    #[test]
    fn test_word_ngrams_respect_case_setting() {
        let mut config = NGramConfig::new("ngram", NGramSource::Word).with_range(1, 1);
        config.lower_case = false;
        let generator = CandidateGenerator::from_config(&config).unwrap();
        let dist = generator.candidates(&example().view(), "ex").unwrap();
        assert_eq!(dist.count("The"), 2);
        assert_eq!(dist.count("the"), 0);
    }

    #[test]
    fn test_stopwords_filter_partial_matches() {
        let mut config = NGramConfig::new("ngram", NGramSource::Word).with_range(1, 2);
        config.stopwords = vec!["the".into(), ".".into()];
        config.filter_partial_matches = true;
        let generator = CandidateGenerator::from_config(&config).unwrap();
        let dist = generator.candidates(&example().view(), "ex").unwrap();
        assert!(!dist.contains("the_cat"));
        assert!(dist.contains("cat_sat"));
        assert!(!dist.contains("the"));
    }

    #[test]
    fn test_character_ngrams_mark_word_boundaries() {
        let config = NGramConfig::new("chars", NGramSource::Character).with_range(2, 2);
        let generator = CandidateGenerator::from_config(&config).unwrap();
        let doc = Document::from_words("c", &[&["Ab"][..]]);
        let dist = generator.candidates(&doc.view(), "c").unwrap();
        let mut keys: Vec<&str> = dist.keys().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["^a", "ab", "b$"]);
    }

    #[test]
    fn test_pos_ngrams_skip_untagged_tokens() {
        let config = NGramConfig::new("pos", NGramSource::PartOfSpeech).with_range(2, 2);
        let generator = CandidateGenerator::from_config(&config).unwrap();
        let mut doc = Document::new("p");
        doc.sentences.push(Sentence {
            tokens: vec![
                Token::new("The").with_pos("DET"),
                Token::new("cat").with_pos("NN"),
                Token::new("!"),
                Token::new("sat").with_pos("VB"),
            ],
        });
        let dist = generator.candidates(&doc.view(), "p").unwrap();
        assert_eq!(dist.count("DET_NN"), 1);
        assert_eq!(dist.count("NN_VB"), 1);
    }

    #[test]
    fn test_phonetic_ngrams_use_language_encoder() {
        let config = NGramConfig::new("phon", NGramSource::Phonetic).with_range(1, 1);
        let generator = CandidateGenerator::from_config(&config).unwrap();
        let doc = Document::from_words("ph", &[&["Robert", "Rupert", "!"][..]]).with_language("en");
        let dist = generator.candidates(&doc.view(), "ph").unwrap();
        assert_eq!(dist.count("R163"), 2);
        assert_eq!(dist.len(), 1);
    }

    #[test]
    fn test_phonetic_ngrams_unsupported_language_fails() {
        let config = NGramConfig::new("phon", NGramSource::Phonetic).with_range(1, 1);
        let generator = CandidateGenerator::from_config(&config).unwrap();
        let doc = Document::from_words("fr", &[&["bonjour"][..]]).with_language("fr");
        let err = generator.candidates(&doc.view(), "fr").unwrap_err();
        assert!(matches!(err, TcError::Document { .. }));
    }

    #[test]
    fn test_keyword_ngrams_span_sentences() {
        let options = KeywordOptions {
            keywords: vec!["peach".into(), "nectarine".into()],
            mark_sentence_boundary: true,
            ..KeywordOptions::default()
        };
        let config = NGramConfig::new("keyNG", NGramSource::Keyword(options)).with_range(2, 3);
        let generator = CandidateGenerator::from_config(&config).unwrap();
        let doc = Document::from_words(
            "k",
            &[&["A", "peach", "."][..], &["Nectarine", "!"][..]],
        );
        let dist = generator.candidates(&doc.view(), "k").unwrap();
        assert!(dist.contains("peach_SB"));
        assert!(dist.contains("peach_SB_nectarine"));
        assert!(dist.contains("nectarine_SB"));
    }

    #[test]
    fn test_missing_stopword_file_is_config_error() {
        let mut config = NGramConfig::new("ngram", NGramSource::Word);
        config.stopwords_file = Some("/no/such/stopwords.txt".into());
        assert!(matches!(
            CandidateGenerator::from_config(&config),
            Err(TcError::Config(_))
        ));
    }
}
