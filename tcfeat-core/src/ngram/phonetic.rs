//! Phonetic codes for phonetic n-grams.
//!
//! English tokens are coded with American Soundex, German tokens with the
//! Cologne phonetic algorithm (Kölner Phonetik).

use crate::error::{Result, TcError};

/// Supported phonetic encoders, selected by document language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneticEncoder {
    Soundex,
    Cologne,
}

impl PhoneticEncoder {
    /// Pick the encoder for an ISO 639-1 language code.
    pub fn for_language(language: &str) -> Result<Self> {
        match language.to_ascii_lowercase().as_str() {
            "en" => Ok(Self::Soundex),
            "de" => Ok(Self::Cologne),
            other => Err(TcError::config(format!(
                "no phonetic encoder for language '{other}' (supported: en, de)"
            ))),
        }
    }

    pub fn encode(&self, word: &str) -> String {
        match self {
            Self::Soundex => soundex(word),
            Self::Cologne => cologne(word),
        }
    }
}

fn soundex_digit(c: char) -> Option<char> {
    match c {
        'B' | 'F' | 'P' | 'V' => Some('1'),
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => Some('2'),
        'D' | 'T' => Some('3'),
        'L' => Some('4'),
        'M' | 'N' => Some('5'),
        'R' => Some('6'),
        _ => None,
    }
}

/// American Soundex. Non-letters are ignored; an empty word codes to "".
pub fn soundex(word: &str) -> String {
    let letters: Vec<char> = word
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let Some((&first, rest)) = letters.split_first() else {
        return String::new();
    };

    let mut code = String::with_capacity(4);
    code.push(first);
    let mut last = soundex_digit(first);
    for &c in rest {
        if code.len() == 4 {
            break;
        }
        match c {
            // H and W do not separate letters with equal codes
            'H' | 'W' => continue,
            'A' | 'E' | 'I' | 'O' | 'U' | 'Y' => last = None,
            _ => {
                let digit = soundex_digit(c);
                if let Some(d) = digit.filter(|_| digit != last) {
                    code.push(d);
                }
                last = digit;
            }
        }
    }
    while code.len() < 4 {
        code.push('0');
    }
    code
}

fn fold_german(c: char) -> Option<char> {
    match c {
        'Ä' | 'ä' => Some('A'),
        'Ö' | 'ö' => Some('O'),
        'Ü' | 'ü' => Some('U'),
        'ß' => Some('S'),
        c if c.is_ascii_alphabetic() => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}

/// Cologne phonetic code. Non-letters are ignored; an empty word codes to "".
pub fn cologne(word: &str) -> String {
    let letters: Vec<char> = word.chars().filter_map(fold_german).collect();
    let mut raw = String::with_capacity(letters.len() + 2);

    for (i, &c) in letters.iter().enumerate() {
        let prev = if i > 0 { Some(letters[i - 1]) } else { None };
        let next = letters.get(i + 1).copied();
        let code: &str = match c {
            'A' | 'E' | 'I' | 'J' | 'O' | 'U' | 'Y' => "0",
            'H' => "",
            'B' => "1",
            'P' => {
                if next == Some('H') {
                    "3"
                } else {
                    "1"
                }
            }
            'D' | 'T' => {
                if matches!(next, Some('C' | 'S' | 'Z')) {
                    "8"
                } else {
                    "2"
                }
            }
            'F' | 'V' | 'W' => "3",
            'G' | 'K' | 'Q' => "4",
            'C' => {
                let hard = match prev {
                    None => matches!(
                        next,
                        Some('A' | 'H' | 'K' | 'L' | 'O' | 'Q' | 'R' | 'U' | 'X')
                    ),
                    Some('S' | 'Z') => false,
                    Some(_) => matches!(next, Some('A' | 'H' | 'K' | 'O' | 'Q' | 'U' | 'X')),
                };
                if hard { "4" } else { "8" }
            }
            'X' => {
                if matches!(prev, Some('C' | 'K' | 'Q')) {
                    "8"
                } else {
                    "48"
                }
            }
            'L' => "5",
            'M' | 'N' => "6",
            'R' => "7",
            'S' | 'Z' => "8",
            _ => "",
        };
        raw.push_str(code);
    }

    let mut code = String::with_capacity(raw.len());
    let mut last = None;
    for (i, digit) in raw.chars().enumerate() {
        if last == Some(digit) {
            continue;
        }
        last = Some(digit);
        if digit != '0' || i == 0 {
            code.push(digit);
        }
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soundex_known_codes() {
        assert_eq!(soundex("Robert"), "R163");
        assert_eq!(soundex("Rupert"), "R163");
        assert_eq!(soundex("Ashcraft"), "A261");
        assert_eq!(soundex("Tymczak"), "T522");
        assert_eq!(soundex("Pfister"), "P236");
        assert_eq!(soundex("Lee"), "L000");
    }

    #[test]
    fn test_soundex_ignores_non_letters() {
        assert_eq!(soundex("O'Hara"), soundex("OHara"));
        assert_eq!(soundex("42"), "");
    }

    #[test]
    fn test_cologne_known_codes() {
        assert_eq!(cologne("Wikipedia"), "3412");
        assert_eq!(cologne("Müller-Lüdenscheidt"), "65752682");
        assert_eq!(cologne("Meier"), cologne("Mayr"));
    }

    #[test]
    fn test_cologne_empty() {
        assert_eq!(cologne(""), "");
        assert_eq!(cologne("--"), "");
    }

    #[test]
    fn test_encoder_for_language() {
        assert_eq!(
            PhoneticEncoder::for_language("EN").unwrap(),
            PhoneticEncoder::Soundex
        );
        assert_eq!(
            PhoneticEncoder::for_language("de").unwrap(),
            PhoneticEncoder::Cologne
        );
        assert!(matches!(
            PhoneticEncoder::for_language("fr"),
            Err(TcError::Config(_))
        ));
    }
}
