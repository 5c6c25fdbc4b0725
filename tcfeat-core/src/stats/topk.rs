//! Bounded top-K selection over a frequency distribution.
//!
//! A min-heap of capacity K keyed by `(count, term)` keeps the K largest keys
//! seen so far. Keys compare by count first and then by term, so among equal
//! counts the smaller term is evicted first and the larger term survives.

use crate::stats::freq::FrequencyDistribution;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Keeps the `capacity` largest items pushed into it.
#[derive(Debug, Clone)]
pub struct BoundedHeap<T: Ord> {
    capacity: usize,
    heap: BinaryHeap<Reverse<T>>,
}

impl<T: Ord> BoundedHeap<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1).min(1 << 16)),
        }
    }

    /// Offer an item; returns whether it is currently retained.
    pub fn push(&mut self, item: T) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(item));
            return true;
        }
        let evict = matches!(self.heap.peek(), Some(Reverse(min)) if item > *min);
        if evict {
            self.heap.pop();
            self.heap.push(Reverse(item));
        }
        evict
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Retained items, largest first.
    pub fn into_sorted_desc(self) -> Vec<T> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(item)| item)
            .collect()
    }
}

/// Selects the K most frequent terms of a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedTopKSelector {
    k: usize,
}

impl BoundedTopKSelector {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// `min(K, |dist|)` terms with their counts, descending by count; equal
    /// counts are ordered by descending term.
    pub fn select(&self, dist: &FrequencyDistribution) -> Vec<(String, u64)> {
        let mut heap = BoundedHeap::new(self.k.min(dist.len()));
        for (term, count) in dist.iter() {
            heap.push((count, term));
        }
        heap.into_sorted_desc()
            .into_iter()
            .map(|(count, term)| (term.to_string(), count))
            .collect()
    }
}
