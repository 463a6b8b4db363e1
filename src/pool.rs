//! Fixed-capacity pool of reusable chunk buffers.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{bounded, select, Receiver, Sender};
use log::warn;

use crate::cancel::CancelToken;
use crate::error::{FreqError, Result};

/// Pool of owned byte buffers, each exactly `chunk_size` bytes long.
///
/// Buffers are allocated lazily up to `capacity`; once that many are in circulation,
/// [`BufferPool::acquire`] blocks until one is released or the pipeline is cancelled.
#[derive(Debug)]
pub struct BufferPool {
    free_tx: Sender<Vec<u8>>,
    free_rx: Receiver<Vec<u8>>,
    allocated: AtomicUsize,
    capacity: usize,
    chunk_size: usize,
}

impl BufferPool {
    /// Creates an empty pool that will hand out at most `capacity` buffers of `chunk_size` bytes.
    #[must_use]
    pub fn new(capacity: usize, chunk_size: usize) -> Self {
        let capacity = capacity.max(1);
        let (free_tx, free_rx) = bounded(capacity);
        Self {
            free_tx,
            free_rx,
            allocated: AtomicUsize::new(0),
            capacity,
            chunk_size,
        }
    }

    /// Number of buffers allocated so far.
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }

    /// Number of released buffers waiting for reuse.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free_rx.len()
    }

    /// Returns a free buffer without blocking, allocating one if the pool has headroom.
    pub fn try_acquire(&self) -> Option<Vec<u8>> {
        if let Ok(buffer) = self.free_rx.try_recv() {
            return Some(buffer);
        }
        self.try_allocate()
    }

    /// Returns a free buffer, waiting for a release when the pool is exhausted.
    ///
    /// Fails with [`FreqError::Cancelled`] if the token fires while waiting.
    pub fn acquire(&self, cancel: &CancelToken) -> Result<Vec<u8>> {
        if let Some(buffer) = self.try_acquire() {
            return Ok(buffer);
        }
        select! {
            recv(self.free_rx) -> buffer => buffer.map_err(|_| {
                FreqError::Internal("buffer pool free list disconnected".into())
            }),
            recv(cancel.listener()) -> _ => Err(FreqError::Cancelled),
        }
    }

    /// Returns a buffer to the pool for reuse.
    pub fn release(&self, mut buffer: Vec<u8>) {
        if buffer.len() != self.chunk_size {
            buffer.resize(self.chunk_size, 0);
        }
        // The free list holds `capacity` slots, so this only fails for foreign buffers.
        if self.free_tx.try_send(buffer).is_err() {
            warn!("dropping buffer released to a full pool");
        }
    }

    fn try_allocate(&self) -> Option<Vec<u8>> {
        let mut current = self.allocated.load(Ordering::Acquire);
        while current < self.capacity {
            match self.allocated.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(vec![0u8; self.chunk_size]),
                Err(observed) => current = observed,
            }
        }
        None
    }
}
