//! Contiguous and skip n-gram subsequence generation.
//!
//! [`SkipGrams`] enumerates, for every length `L` in `[min_n, max_n]`, all
//! strictly increasing index tuples whose span (last index minus first) is at
//! most `(L - 1) * (skip + 1)`. Tuples of one length are emitted in
//! lexicographic order before moving on to the next length. With `skip = 0`
//! this is the classic contiguous n-gram enumeration.

use crate::error::{Result, TcError};

/// Restartable generator of (skip) n-grams over a borrowed token slice.
#[derive(Debug, Clone, Copy)]
pub struct SkipGrams<'a, T> {
    items: &'a [T],
    min_n: usize,
    max_n: usize,
    skip: usize,
}

impl<'a, T> SkipGrams<'a, T> {
    /// Validate the length range and build a generator.
    pub fn new(items: &'a [T], min_n: usize, max_n: usize, skip: usize) -> Result<Self> {
        if min_n == 0 {
            return Err(TcError::config("n-gram min_n must be at least 1"));
        }
        if min_n > max_n {
            return Err(TcError::config(format!(
                "n-gram min_n ({min_n}) exceeds max_n ({max_n})"
            )));
        }
        Ok(Self {
            items,
            min_n,
            max_n,
            skip,
        })
    }

    /// Contiguous n-grams, i.e. `skip = 0`.
    pub fn contiguous(items: &'a [T], min_n: usize, max_n: usize) -> Result<Self> {
        Self::new(items, min_n, max_n, 0)
    }

    /// Start a fresh enumeration.
    pub fn iter(&self) -> SkipGramIter<'a, T> {
        SkipGramIter {
            items: self.items,
            skip: self.skip,
            len: self.min_n,
            max_len: self.max_n.min(self.items.len()),
            indices: Vec::new(),
            started: false,
        }
    }
}

impl<'a, T> IntoIterator for &SkipGrams<'a, T> {
    type Item = Vec<&'a T>;
    type IntoIter = SkipGramIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over the subsequences of a [`SkipGrams`] generator.
#[derive(Debug, Clone)]
pub struct SkipGramIter<'a, T> {
    items: &'a [T],
    skip: usize,
    len: usize,
    max_len: usize,
    indices: Vec<usize>,
    started: bool,
}

impl<'a, T> SkipGramIter<'a, T> {
    fn max_span(&self) -> usize {
        max_span(self.len, self.skip)
    }

    /// Move `indices` to the lexicographically next valid tuple of the current length.
    fn advance(&mut self) -> bool {
        let n = self.items.len();
        let l = self.len;
        let max_span = self.max_span();
        for k in (0..l).rev() {
            let value = self.indices[k] + 1;
            let last = value + (l - 1 - k);
            if last >= n {
                continue;
            }
            let first = if k == 0 { value } else { self.indices[0] };
            if last - first > max_span {
                continue;
            }
            for (offset, slot) in self.indices[k..].iter_mut().enumerate() {
                *slot = value + offset;
            }
            return true;
        }
        false
    }

    fn current(&self) -> Vec<&'a T> {
        self.indices.iter().map(|&i| &self.items[i]).collect()
    }
}

impl<'a, T> Iterator for SkipGramIter<'a, T> {
    type Item = Vec<&'a T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.len > self.max_len {
                return None;
            }
            if !self.started {
                self.indices = (0..self.len).collect();
                self.started = true;
                return Some(self.current());
            }
            if self.advance() {
                return Some(self.current());
            }
            self.len += 1;
            self.started = false;
        }
    }
}

/// Widest allowed distance between the first and last index of a tuple.
fn max_span(len: usize, skip: usize) -> usize {
    (len - 1).saturating_mul(skip.saturating_add(1))
}

/// Number of subsequences of length `len` among `n` items with the given skip.
///
/// Counts the tuples the generator would emit without materializing them.
/// Saturates at `usize::MAX`.
pub fn count_subsequences(n: usize, len: usize, skip: usize) -> usize {
    if len == 0 || len > n {
        return 0;
    }
    if len == 1 {
        return n;
    }
    let max_span = max_span(len, skip);
    // Tuples with a fixed first index: choose len - 1 of the following
    // min(max_span, n - 1 - first) positions.
    (0..n)
        .map(|first| {
            let room = max_span.min(n - 1 - first);
            binomial(room, len - 1)
        })
        .fold(0usize, usize::saturating_add)
}

fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        // acc * (n - i) is divisible by (i + 1) at every step
        match acc.checked_mul((n - i) as u128) {
            Some(product) => acc = product / (i as u128 + 1),
            None => return usize::MAX,
        }
    }
    usize::try_from(acc).unwrap_or(usize::MAX)
}
