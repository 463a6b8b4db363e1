//! Word → occurrence count tables used by workers and by the global accumulator.

use std::collections::hash_map;

use rustc_hash::FxHashMap;

use crate::tokenizer::normalize_word;

/// Mapping from lower-cased word to its number of occurrences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: FxHashMap<String, u64>,
}

impl FrequencyTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one occurrence of an already normalised word.
    pub fn increment(&mut self, word: &str) {
        self.add(word, 1);
    }

    /// Adds `count` occurrences of an already normalised word.
    pub fn add(&mut self, word: &str, count: u64) {
        if let Some(existing) = self.counts.get_mut(word) {
            *existing += count;
        } else {
            self.counts.insert(word.to_owned(), count);
        }
    }

    /// Lower-cases a raw token and counts one occurrence of it.
    pub fn count_token(&mut self, raw: &[u8]) {
        let word = normalize_word(raw);
        *self.counts.entry(word).or_insert(0) += 1;
    }

    /// Folds another table into this one, summing counts word by word.
    pub fn merge(&mut self, other: FrequencyTable) {
        if self.counts.is_empty() {
            self.counts = other.counts;
            return;
        }
        self.counts.reserve(other.counts.len());
        for (word, count) in other.counts {
            *self.counts.entry(word).or_insert(0) += count;
        }
    }

    /// Returns the count recorded for `word`, or zero.
    #[must_use]
    pub fn get(&self, word: &str) -> u64 {
        self.counts.get(word).copied().unwrap_or(0)
    }

    /// Number of distinct words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns true when no word has been counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

impl IntoIterator for FrequencyTable {
    type Item = (String, u64);
    type IntoIter = hash_map::IntoIter<String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}

impl FromIterator<(String, u64)> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (word, count) in iter {
            *table.counts.entry(word).or_insert(0) += count;
        }
        table
    }
}
