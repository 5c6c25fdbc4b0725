//! Named feature values.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Restrict a feature name to ASCII-safe characters.
///
/// Letters, digits and `_` are kept; every other character becomes `U`
/// followed by its decimal code point. The mapping is not injective:
/// `"a.b"` and `"aU46b"` both escape to `"aU46b"`.
pub fn escape_feature_name(name: &str) -> Cow<'_, str> {
    if name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Cow::Borrowed(name);
    }
    let mut out = String::with_capacity(name.len() + 8);
    for c in name.chars() {
        if c.is_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push('U');
            out.push_str(&u32::from(c).to_string());
        }
    }
    Cow::Owned(out)
}

/// Typed placeholder for a value that could not be computed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MissingValue {
    Numeric,
    Boolean,
    String,
    Nominal { domain: Vec<String> },
}

/// The value carried by a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureValue {
    Number(f64),
    Boolean(bool),
    String(String),
    Nominal { value: String, domain: Vec<String> },
    Missing(MissingValue),
}

impl FeatureValue {
    /// A number; non-finite input becomes a numeric missing value.
    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            Self::Number(value)
        } else {
            Self::Missing(MissingValue::Numeric)
        }
    }

    /// `numerator / denominator`, missing when the denominator is zero.
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            Self::Missing(MissingValue::Numeric)
        } else {
            Self::number(numerator / denominator)
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }

    /// Numeric view used by sparse encoders; `None` for missing values.
    ///
    /// Booleans are 1/0, strings are 1 (present), nominal values are their
    /// position in the domain.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::String(_) => Some(1.0),
            Self::Nominal { value, domain } => Some(
                domain
                    .iter()
                    .position(|d| d == value)
                    .map_or(0.0, |p| p as f64),
            ),
            Self::Missing(_) => None,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        Self::number(value)
    }
}

impl From<usize> for FeatureValue {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

#[derive(Deserialize)]
struct FeatureRecord {
    name: String,
    value: FeatureValue,
}

impl From<FeatureRecord> for Feature {
    fn from(record: FeatureRecord) -> Self {
        Feature::new(record.name, record.value)
    }
}

/// A named value. Equality, ordering and hashing use the name only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "FeatureRecord")]
pub struct Feature {
    name: String,
    value: FeatureValue,
}

impl Feature {
    /// The name is escaped on construction.
    pub fn new(name: impl AsRef<str>, value: impl Into<FeatureValue>) -> Self {
        Self {
            name: escape_feature_name(name.as_ref()).into_owned(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &FeatureValue {
        &self.value
    }

    pub fn into_parts(self) -> (String, FeatureValue) {
        (self.name, self.value)
    }
}

impl PartialEq for Feature {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Feature {}

impl Hash for Feature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for Feature {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Feature {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_keeps_safe_names() {
        assert!(matches!(escape_feature_name("ngram_the_cat"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape_replaces_with_code_points() {
        assert_eq!(escape_feature_name("ngram_sat_."), "ngram_sat_U46");
        assert_eq!(escape_feature_name("a b"), "aU32b");
        assert_eq!(escape_feature_name("charngram_^a"), "charngram_U94a");
    }

    #[test]
    fn test_escape_collision() {
        assert_eq!(escape_feature_name("a.b"), escape_feature_name("aU46b"));
    }

    #[test]
    fn test_equality_by_name_only() {
        let a = Feature::new("x", 1.0);
        let b = Feature::new("x", 2.0);
        assert_eq!(a, b);
        assert!(Feature::new("a", 9.0) < Feature::new("b", 0.0));
    }

    #[test]
    fn test_ratio_zero_denominator_is_missing() {
        assert_eq!(
            FeatureValue::ratio(3.0, 0.0),
            FeatureValue::Missing(MissingValue::Numeric)
        );
        assert_eq!(FeatureValue::ratio(3.0, 2.0), FeatureValue::Number(1.5));
        assert!(FeatureValue::number(f64::NAN).is_missing());
    }

    #[test]
    fn test_as_f64_conversions() {
        assert_eq!(FeatureValue::Boolean(true).as_f64(), Some(1.0));
        assert_eq!(FeatureValue::String("x".into()).as_f64(), Some(1.0));
        let nominal = FeatureValue::Nominal {
            value: "b".into(),
            domain: vec!["a".into(), "b".into()],
        };
        assert_eq!(nominal.as_f64(), Some(1.0));
        assert_eq!(FeatureValue::Missing(MissingValue::Boolean).as_f64(), None);
    }

    #[test]
    fn test_deserialize_escapes_name() {
        let feature: Feature =
            serde_json::from_str(r#"{"name": "a.b", "value": {"number": 1.0}}"#).unwrap();
        assert_eq!(feature.name(), "aU46b");
    }

    #[test]
    fn test_missing_value_serialization() {
        let json = serde_json::to_string(&FeatureValue::Missing(MissingValue::Numeric)).unwrap();
        assert_eq!(json, r#"{"missing":{"type":"numeric"}}"#);
    }
}
