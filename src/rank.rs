//! Deterministic ranking of a frequency table.

use std::cmp::Ordering;
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::frequency::FrequencyTable;

/// Tables with more distinct words than this are sorted on the Rayon pool.
const PARALLEL_SORT_THRESHOLD: usize = 1 << 15;

/// One `(word, frequency)` pair of the final ranking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankedEntry {
    /// Lower-cased word.
    pub word: String,
    /// Number of occurrences in the input.
    pub frequency: u64,
}

impl RankedEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(word: impl Into<String>, frequency: u64) -> Self {
        Self {
            word: word.into(),
            frequency,
        }
    }
}

impl fmt::Display for RankedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.word, self.frequency)
    }
}

/// Ranking order: frequency descending, then word ascending in code-point order.
#[must_use]
pub fn compare_entries(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    b.frequency
        .cmp(&a.frequency)
        .then_with(|| a.word.cmp(&b.word))
}

/// Sorts entries in ranking order.
pub fn sort_ranked(entries: &mut [RankedEntry]) {
    // The order is total over distinct words, so an unstable sort is deterministic.
    if entries.len() > PARALLEL_SORT_THRESHOLD {
        entries.par_sort_unstable_by(compare_entries);
    } else {
        entries.sort_unstable_by(compare_entries);
    }
}

/// Returns true if `entries` is already in ranking order.
#[must_use]
pub fn is_ranked(entries: &[RankedEntry]) -> bool {
    entries
        .windows(2)
        .all(|pair| compare_entries(&pair[0], &pair[1]) != Ordering::Greater)
}

/// Converts a frequency table into its ranking.
#[must_use]
pub fn rank(table: FrequencyTable) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = table
        .into_iter()
        .map(|(word, frequency)| RankedEntry { word, frequency })
        .collect();
    sort_ranked(&mut entries);
    entries
}
