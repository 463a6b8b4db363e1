//! Reassembly of words that straddle chunk boundaries.

use crate::error::{FreqError, Result};
use crate::frequency::FrequencyTable;
use crate::tokenizer::{for_each_word, ChunkTokens};

/// Edge fragments of one chunk, copied out of its buffer before the buffer is reused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundaryRecord {
    /// Ordinal of the chunk the fragments came from.
    pub ordinal: u64,
    /// Bytes before the chunk's first whitespace.
    pub begin: Vec<u8>,
    /// Bytes after the chunk's last whitespace.
    pub reminder: Vec<u8>,
    /// The chunk had no whitespace; `begin` holds all of it.
    pub chunk_is_word: bool,
}

impl BoundaryRecord {
    /// Copies the fragments described by `tokens` out of `bytes`.
    #[must_use]
    pub fn from_tokens(ordinal: u64, bytes: &[u8], tokens: &ChunkTokens) -> Self {
        Self {
            ordinal,
            begin: bytes[tokens.begin.clone()].to_vec(),
            reminder: bytes[tokens.reminder.clone()].to_vec(),
            chunk_is_word: tokens.chunk_is_word,
        }
    }
}

/// Stitches boundary fragments back together and counts the words they form.
///
/// Records may arrive in any order; they are sorted by ordinal first and must cover
/// `0..records.len()` without gaps. Returns the number of words counted.
pub fn reassemble(mut records: Vec<BoundaryRecord>, table: &mut FrequencyTable) -> Result<u64> {
    records.sort_unstable_by_key(|record| record.ordinal);
    if let Some((position, record)) = records
        .iter()
        .enumerate()
        .find(|(position, record)| record.ordinal != *position as u64)
    {
        return Err(FreqError::Internal(format!(
            "boundary record {} found at position {position}; a chunk result is missing or duplicated",
            record.ordinal
        )));
    }

    let mut counted = 0u64;
    let mut pending: Vec<u8> = Vec::new();
    for record in records {
        pending.extend_from_slice(&record.begin);
        if !record.chunk_is_word {
            counted += flush(&mut pending, table);
        }
        pending.extend_from_slice(&record.reminder);
    }
    counted += flush(&mut pending, table);
    Ok(counted)
}

/// Counts the words in `pending` and clears it.
///
/// `pending` is normally a single word, but a multi-byte whitespace code point cut by a
/// chunk boundary only becomes decodable once both halves are joined here.
fn flush(pending: &mut Vec<u8>, table: &mut FrequencyTable) -> u64 {
    let mut counted = 0u64;
    for_each_word(pending, |word| {
        table.count_token(word);
        counted += 1;
    });
    pending.clear();
    counted
}
