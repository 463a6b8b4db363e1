//! Single-threaded counting strategies.
//!
//! These scan the stream once, front to back, and serve as the reference the parallel
//! pipeline must agree with.

use std::io::{ErrorKind, Read};

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::{FreqError, Result};
use crate::frequency::FrequencyTable;
use crate::rank::{rank, RankedEntry};
use crate::tokenizer::classify;

/// Incremental whitespace tokenizer that accepts input in arbitrary pieces.
///
/// A code point cut between two calls to [`WordScanner::feed`] is held back until the
/// next piece arrives, so the words produced never depend on how the input was split.
#[derive(Debug, Default)]
pub struct WordScanner {
    table: FrequencyTable,
    word: Vec<u8>,
    carry: Vec<u8>,
}

impl WordScanner {
    /// Creates an empty scanner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the next piece of input.
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.carry.is_empty() {
            let cut = bytes.len() - incomplete_tail(bytes);
            self.scan(&bytes[..cut]);
            self.carry.extend_from_slice(&bytes[cut..]);
        } else {
            let mut joined = std::mem::take(&mut self.carry);
            joined.extend_from_slice(bytes);
            let cut = joined.len() - incomplete_tail(&joined);
            self.scan(&joined[..cut]);
            self.carry.extend_from_slice(&joined[cut..]);
        }
    }

    /// Flushes any pending bytes and returns the counts.
    #[must_use]
    pub fn finish(mut self) -> FrequencyTable {
        let carry = std::mem::take(&mut self.carry);
        self.scan(&carry);
        if !self.word.is_empty() {
            self.table.count_token(&self.word);
        }
        self.table
    }

    fn scan(&mut self, bytes: &[u8]) {
        let mut offset = 0usize;
        while offset < bytes.len() {
            let (is_space, width) = classify(&bytes[offset..]);
            if is_space {
                if !self.word.is_empty() {
                    self.table.count_token(&self.word);
                    self.word.clear();
                }
            } else {
                self.word.extend_from_slice(&bytes[offset..offset + width]);
            }
            offset += width;
        }
    }
}

/// Length of a trailing prefix of a multi-byte code point that more input could complete.
fn incomplete_tail(bytes: &[u8]) -> usize {
    let floor = bytes.len().saturating_sub(3);
    for start in (floor..bytes.len()).rev() {
        if bytes[start] & 0xC0 != 0x80 {
            let (ch, width) = bstr::decode_utf8(&bytes[start..]);
            if ch.is_none() && width == bytes.len() - start && bytes[start] >= 0xC2 {
                return width;
            }
            return 0;
        }
    }
    0
}

/// Counts every word of `reader` in a single sequential pass.
pub fn count_table<R: Read>(mut reader: R) -> Result<FrequencyTable> {
    let mut buffer = vec![0u8; DEFAULT_CHUNK_SIZE];
    let mut scanner = WordScanner::new();
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FreqError::io(err, None)),
        };
        scanner.feed(&buffer[..read]);
    }
    Ok(scanner.finish())
}

/// Counts and ranks every word of `reader` in a single sequential pass.
pub fn count_sequential<R: Read>(reader: R) -> Result<Vec<RankedEntry>> {
    count_table(reader).map(rank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn counts_lowercased_words() {
        let ranked = count_sequential(Cursor::new("The cat sat. THE CAT SAT.")).unwrap();
        assert_eq!(
            ranked,
            vec![
                RankedEntry::new("cat", 2),
                RankedEntry::new("sat.", 2),
                RankedEntry::new("the", 2),
            ]
        );
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(count_sequential(std::io::empty()).unwrap().is_empty());
    }

    #[test]
    fn feeding_byte_by_byte_matches_whole_input() {
        let text = "na\u{00EF}ve\u{2003}caf\u{00E9} NA\u{00CF}VE\u{3000}x \u{1F600} end";
        let mut whole = WordScanner::new();
        whole.feed(text.as_bytes());
        let whole = whole.finish();

        let mut pieces = WordScanner::new();
        for byte in text.as_bytes() {
            pieces.feed(std::slice::from_ref(byte));
        }
        assert_eq!(pieces.finish(), whole);
        assert_eq!(whole.get("na\u{00EF}ve"), 2);
        assert_eq!(whole.get("caf\u{00E9}"), 1);
        assert_eq!(whole.get("\u{1F600}"), 1);
    }

    #[test]
    fn truncated_tail_counts_as_word_bytes() {
        let table = count_table(Cursor::new(b"ok \xE2\x80".to_vec())).unwrap();
        assert_eq!(table.get("ok"), 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn incomplete_tail_detects_prefixes() {
        assert_eq!(incomplete_tail(b"abc"), 0);
        assert_eq!(incomplete_tail(b"ab\xE2\x80"), 2);
        assert_eq!(incomplete_tail(b"ab\xF0\x9F\x98"), 3);
        assert_eq!(incomplete_tail(b"ab\xC3"), 1);
        assert_eq!(incomplete_tail(b"\x80\x80"), 0);
        assert_eq!(incomplete_tail("\u{00E9}".as_bytes()), 0);
    }
}
