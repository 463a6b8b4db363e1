//! Chunk source: pulls fixed-size, ordinally tagged chunks out of a byte stream.

use std::io::{self, ErrorKind, Read};
use std::time::Instant;

use crossbeam_channel::{select, Sender};
use log::debug;

use crate::cancel::CancelToken;
use crate::error::{FreqError, Result};
use crate::pool::BufferPool;

/// Contiguous slice of the input stream held in a pooled buffer.
///
/// Owned by exactly one stage at a time: the source fills it, a worker tokenizes it, and
/// the collector returns its buffer to the pool.
#[derive(Debug)]
pub struct Chunk {
    /// Position of the chunk in the stream, starting at zero.
    pub ordinal: u64,
    buffer: Vec<u8>,
    len: usize,
}

impl Chunk {
    /// Wraps a filled buffer; `len` must not exceed the buffer length.
    #[must_use]
    pub fn new(ordinal: u64, buffer: Vec<u8>, len: usize) -> Self {
        debug_assert!(len <= buffer.len());
        let len = len.min(buffer.len());
        Self {
            ordinal,
            buffer,
            len,
        }
    }

    /// The valid bytes of the chunk.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// Number of valid bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true for a chunk holding no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gives the underlying buffer back so it can be released to the pool.
    #[must_use]
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }
}

/// Totals reported by a [`ChunkSource`] once the stream is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Number of chunks published.
    pub chunks: u64,
    /// Number of bytes read from the stream.
    pub bytes: u64,
}

/// Reads a stream into pooled buffers and tags each read with the next ordinal.
#[derive(Debug)]
pub struct ChunkSource<'p, R> {
    reader: R,
    pool: &'p BufferPool,
    next_ordinal: u64,
    bytes: u64,
    log_chunks: bool,
}

impl<'p, R: Read> ChunkSource<'p, R> {
    /// Creates a source reading from `reader` into buffers taken from `pool`.
    pub fn new(reader: R, pool: &'p BufferPool) -> Self {
        Self {
            reader,
            pool,
            next_ordinal: 0,
            bytes: 0,
            log_chunks: false,
        }
    }

    /// Enables per-chunk debug timings.
    #[must_use]
    pub fn log_chunks(mut self, enabled: bool) -> Self {
        self.log_chunks = enabled;
        self
    }

    /// Totals so far.
    #[must_use]
    pub fn stats(&self) -> SourceStats {
        SourceStats {
            chunks: self.next_ordinal,
            bytes: self.bytes,
        }
    }

    /// Reads the next chunk, or `None` once the stream reports end-of-input.
    ///
    /// A zero-length read is end-of-input and produces no chunk. Read errors are returned
    /// as-is and never retried, except for `Interrupted`.
    pub fn next_chunk(&mut self, cancel: &CancelToken) -> Result<Option<Chunk>> {
        let mut buffer = self.pool.acquire(cancel)?;
        let read = match read_some(&mut self.reader, &mut buffer) {
            Ok(read) => read,
            Err(err) => {
                self.pool.release(buffer);
                return Err(FreqError::io(err, None));
            }
        };
        if read == 0 {
            self.pool.release(buffer);
            return Ok(None);
        }
        let chunk = Chunk::new(self.next_ordinal, buffer, read);
        self.next_ordinal += 1;
        self.bytes += read as u64;
        Ok(Some(chunk))
    }

    /// Publishes chunks until the stream is exhausted, then closes `chunks` by dropping it.
    pub fn run(mut self, chunks: Sender<Chunk>, cancel: &CancelToken) -> Result<SourceStats> {
        loop {
            if cancel.is_cancelled() {
                return Err(FreqError::Cancelled);
            }
            let started = Instant::now();
            let Some(chunk) = self.next_chunk(cancel)? else {
                return Ok(self.stats());
            };
            let ordinal = chunk.ordinal;
            let wait_start = Instant::now();
            select! {
                send(chunks, chunk) -> sent => {
                    if sent.is_err() {
                        return Err(disconnected(cancel, "chunk channel closed before end of input"));
                    }
                },
                recv(cancel.listener()) -> _ => return Err(FreqError::Cancelled),
            }
            if self.log_chunks {
                debug!(
                    "read chunk {ordinal} in {:.2?}, waited {:.2?} for a worker",
                    started.elapsed(),
                    wait_start.elapsed()
                );
            }
        }
    }
}

fn read_some<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buffer) {
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Maps a disconnected channel to the error that explains it.
pub(crate) fn disconnected(cancel: &CancelToken, what: &str) -> FreqError {
    if cancel.is_cancelled() {
        FreqError::Cancelled
    } else {
        FreqError::Internal(what.to_owned())
    }
}
