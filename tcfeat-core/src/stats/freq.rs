//! Term frequency distribution.

use std::collections::HashMap;

/// Mutable mapping from term to occurrence count.
///
/// Not synchronized; parallel accumulation builds one distribution per worker
/// and combines them with [`FrequencyDistribution::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyDistribution {
    counts: HashMap<String, u64>,
    total: u64,
}

impl FrequencyDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence.
    pub fn inc(&mut self, term: &str) {
        self.add(term, 1);
    }

    /// Count `n` occurrences.
    pub fn add(&mut self, term: &str, n: u64) {
        if n == 0 {
            return;
        }
        match self.counts.get_mut(term) {
            Some(count) => *count += n,
            None => {
                self.counts.insert(term.to_string(), n);
            }
        }
        self.total += n;
    }

    /// Occurrences of `term`, zero when unseen.
    pub fn count(&self, term: &str) -> u64 {
        self.counts.get(term).copied().unwrap_or(0)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.counts.contains_key(term)
    }

    /// Distinct terms, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(term, count)| (term.as_str(), *count))
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// The most frequent term; equal counts go to the larger term.
    pub fn sample_with_max_frequency(&self) -> Option<&str> {
        self.counts
            .iter()
            .max_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)))
            .map(|(term, _)| term.as_str())
    }

    /// Fold another distribution into this one.
    pub fn merge(&mut self, other: FrequencyDistribution) {
        if self.counts.is_empty() {
            *self = other;
            return;
        }
        for (term, count) in other.counts {
            *self.counts.entry(term).or_insert(0) += count;
        }
        self.total += other.total;
    }

    /// Drop terms seen fewer than `min_count` times.
    pub fn retain_min_count(&mut self, min_count: u64) {
        if min_count <= 1 {
            return;
        }
        let mut removed = 0;
        self.counts.retain(|_, count| {
            let keep = *count >= min_count;
            if !keep {
                removed += *count;
            }
            keep
        });
        self.total -= removed;
    }

    /// Drop terms shorter than `min_length` characters.
    pub fn retain_min_length(&mut self, min_length: usize) {
        if min_length <= 1 {
            return;
        }
        let mut removed = 0;
        self.counts.retain(|term, count| {
            let keep = term.chars().count() >= min_length;
            if !keep {
                removed += *count;
            }
            keep
        });
        self.total -= removed;
    }
}

impl<S: AsRef<str>> FromIterator<S> for FrequencyDistribution {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut dist = Self::new();
        dist.extend(iter);
        dist
    }
}

impl<S: AsRef<str>> Extend<S> for FrequencyDistribution {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for term in iter {
            self.inc(term.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_count() {
        let mut dist = FrequencyDistribution::new();
        dist.inc("peach");
        dist.add("peach", 2);
        dist.inc("cherry");
        dist.add("ignored", 0);
        assert_eq!(dist.count("peach"), 3);
        assert_eq!(dist.count("cherry"), 1);
        assert_eq!(dist.count("missing"), 0);
        assert_eq!(dist.len(), 2);
        assert_eq!(dist.total(), 4);
        assert!(!dist.contains("ignored"));
    }

    #[test]
    fn test_max_frequency_tie_prefers_larger_term() {
        let dist: FrequencyDistribution = ["apple", "pear", "apple", "pear", "fig"]
            .into_iter()
            .collect();
        assert_eq!(dist.sample_with_max_frequency(), Some("pear"));
        assert_eq!(FrequencyDistribution::new().sample_with_max_frequency(), None);
    }

    #[test]
    fn test_merge_sums_counts() {
        let mut a: FrequencyDistribution = ["x", "y"].into_iter().collect();
        let b: FrequencyDistribution = ["y", "z", "z"].into_iter().collect();
        a.merge(b);
        assert_eq!(a.count("x"), 1);
        assert_eq!(a.count("y"), 2);
        assert_eq!(a.count("z"), 2);
        assert_eq!(a.total(), 5);
    }

    #[test]
    fn test_merge_into_empty() {
        let mut a = FrequencyDistribution::new();
        let b: FrequencyDistribution = ["q"].into_iter().collect();
        a.merge(b.clone());
        assert_eq!(a, b);
    }

    #[test]
    fn test_retain_min_count() {
        let mut dist: FrequencyDistribution = ["a", "a", "a", "b", "c", "c"].into_iter().collect();
        dist.retain_min_count(2);
        assert_eq!(dist.len(), 2);
        assert!(!dist.contains("b"));
        assert_eq!(dist.total(), 5);
    }

    #[test]
    fn test_retain_min_length_counts_characters() {
        let mut dist: FrequencyDistribution = ["ab", "é", "abc", "a"].into_iter().collect();
        dist.retain_min_length(2);
        assert!(dist.contains("ab"));
        assert!(dist.contains("abc"));
        assert!(!dist.contains("é"));
        assert_eq!(dist.total(), 2);
    }
}
