//! Whitespace tokenization of individual chunks and word normalisation.
//!
//! A chunk is an arbitrary byte slice of the input; its first and last byte runs may be
//! fragments of words that continue in the neighbouring chunks. [`tokenize_chunk`] counts
//! only the words it can see whole and reports the edge fragments as byte ranges so the
//! collector can copy them out before the buffer is reused.

use std::ops::Range;

use bstr::ByteSlice;

use crate::frequency::FrequencyTable;

/// Result of tokenizing one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkTokens {
    /// Words fully contained in the chunk (bounded by whitespace on both sides).
    pub local: FrequencyTable,
    /// Byte range before the first whitespace, or the whole chunk if it has none.
    pub begin: Range<usize>,
    /// Byte range after the last whitespace; empty if the chunk has no whitespace.
    pub reminder: Range<usize>,
    /// True when the chunk contains no whitespace at all.
    pub chunk_is_word: bool,
}

/// Decodes the code point at the start of `bytes`.
///
/// Returns whether it is Unicode whitespace and its width in bytes. Invalid or truncated
/// sequences decode as non-whitespace so they stay attached to the surrounding word.
#[inline]
pub fn classify(bytes: &[u8]) -> (bool, usize) {
    let (ch, width) = bstr::decode_utf8(bytes);
    (ch.is_some_and(char::is_whitespace), width.max(1))
}

/// Lower-cases a raw word, replacing undecodable bytes with U+FFFD.
#[must_use]
pub fn normalize_word(raw: &[u8]) -> String {
    let lower = raw.to_lowercase();
    match String::from_utf8(lower) {
        Ok(word) => word,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

/// Splits `bytes` on Unicode whitespace and calls `f` with every non-empty run.
pub fn for_each_word<F>(bytes: &[u8], mut f: F)
where
    F: FnMut(&[u8]),
{
    let mut word_start = 0usize;
    let mut offset = 0usize;
    while offset < bytes.len() {
        let (is_space, width) = classify(&bytes[offset..]);
        if is_space {
            if word_start < offset {
                f(&bytes[word_start..offset]);
            }
            word_start = offset + width;
        }
        offset += width;
    }
    if word_start < bytes.len() {
        f(&bytes[word_start..]);
    }
}

/// Tokenizes one chunk.
///
/// The run before the first whitespace becomes `begin` and is never counted here, even
/// when it is a complete word: only the reassembler knows whether the previous chunk ended
/// on a boundary. Likewise the run after the last whitespace becomes `reminder`.
#[must_use]
pub fn tokenize_chunk(bytes: &[u8]) -> ChunkTokens {
    let mut local = FrequencyTable::new();
    let mut begin = None;
    let mut word_start = 0usize;
    let mut offset = 0usize;

    while offset < bytes.len() {
        let (is_space, width) = classify(&bytes[offset..]);
        if is_space {
            if begin.is_none() {
                begin = Some(0..offset);
            } else if word_start < offset {
                local.count_token(&bytes[word_start..offset]);
            }
            word_start = offset + width;
        }
        offset += width;
    }

    match begin {
        Some(begin) => ChunkTokens {
            local,
            begin,
            reminder: word_start..bytes.len(),
            chunk_is_word: false,
        },
        None => ChunkTokens {
            local,
            begin: 0..bytes.len(),
            reminder: bytes.len()..bytes.len(),
            chunk_is_word: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment<'a>(bytes: &'a [u8], range: &Range<usize>) -> &'a [u8] {
        &bytes[range.clone()]
    }

    #[test]
    fn interior_words_are_counted_edges_deferred() {
        let chunk = b"lo world Foo foo ba";
        let tokens = tokenize_chunk(chunk);
        assert!(!tokens.chunk_is_word);
        assert_eq!(fragment(chunk, &tokens.begin), b"lo");
        assert_eq!(fragment(chunk, &tokens.reminder), b"ba");
        assert_eq!(tokens.local.get("world"), 1);
        assert_eq!(tokens.local.get("foo"), 2);
        assert_eq!(tokens.local.get("lo"), 0);
        assert_eq!(tokens.local.get("ba"), 0);
    }

    #[test]
    fn chunk_without_whitespace_is_one_fragment() {
        let chunk = b"abcdef";
        let tokens = tokenize_chunk(chunk);
        assert!(tokens.chunk_is_word);
        assert!(tokens.local.is_empty());
        assert_eq!(fragment(chunk, &tokens.begin), b"abcdef");
        assert!(tokens.reminder.is_empty());
    }

    #[test]
    fn chunk_ending_on_whitespace_has_empty_reminder() {
        let chunk = b"one two ";
        let tokens = tokenize_chunk(chunk);
        assert!(!tokens.chunk_is_word);
        assert_eq!(fragment(chunk, &tokens.begin), b"one");
        assert!(tokens.reminder.is_empty());
        assert_eq!(tokens.local.get("two"), 1);
    }

    #[test]
    fn chunk_starting_on_whitespace_has_empty_begin() {
        let chunk = b" one two";
        let tokens = tokenize_chunk(chunk);
        assert!(tokens.begin.is_empty());
        assert_eq!(tokens.local.get("one"), 1);
        assert_eq!(fragment(chunk, &tokens.reminder), b"two");
    }

    #[test]
    fn whitespace_only_chunk() {
        let tokens = tokenize_chunk(b" \t\n ");
        assert!(!tokens.chunk_is_word);
        assert!(tokens.begin.is_empty());
        assert!(tokens.reminder.is_empty());
        assert!(tokens.local.is_empty());
    }

    #[test]
    fn empty_chunk() {
        let tokens = tokenize_chunk(b"");
        assert!(tokens.chunk_is_word);
        assert!(tokens.begin.is_empty());
        assert!(tokens.reminder.is_empty());
    }

    #[test]
    fn multibyte_whitespace_separates_words() {
        let chunk = "a\u{2003}b\u{00A0}c\u{3000}d".as_bytes();
        let tokens = tokenize_chunk(chunk);
        assert_eq!(fragment(chunk, &tokens.begin), b"a");
        assert_eq!(fragment(chunk, &tokens.reminder), b"d");
        assert_eq!(tokens.local.get("b"), 1);
        assert_eq!(tokens.local.get("c"), 1);
    }

    #[test]
    fn truncated_code_point_stays_in_reminder() {
        // "x é" cut after the first byte of U+00E9.
        let chunk = b"x \xC3";
        let tokens = tokenize_chunk(chunk);
        assert_eq!(fragment(chunk, &tokens.begin), b"x");
        assert_eq!(fragment(chunk, &tokens.reminder), b"\xC3");
    }

    #[test]
    fn for_each_word_splits_on_unicode_whitespace() {
        let mut words = Vec::new();
        for_each_word("  alpha\u{2028}beta\t\tgamma ".as_bytes(), |w| {
            words.push(w.to_vec())
        });
        assert_eq!(
            words,
            vec![b"alpha".to_vec(), b"beta".to_vec(), b"gamma".to_vec()]
        );
    }

    #[test]
    fn normalize_word_handles_invalid_utf8() {
        assert_eq!(normalize_word(b"HeLLo"), "hello");
        assert_eq!(normalize_word(b"AB\xFF"), "ab\u{FFFD}");
    }
}
