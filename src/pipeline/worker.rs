use std::time::Instant;

use crossbeam_channel::{select, Receiver, Sender};
use log::debug;

use crate::cancel::CancelToken;
use crate::chunk::{disconnected, Chunk};
use crate::error::{FreqError, Result};
use crate::tokenizer::{tokenize_chunk, ChunkTokens};

/// Tokenized chunk travelling from a worker to the collector.
///
/// Carries the chunk itself so the collector can copy the boundary fragments out of the
/// buffer and then release it.
#[derive(Debug)]
pub(crate) struct PartialResult {
    pub(crate) chunk: Chunk,
    pub(crate) tokens: ChunkTokens,
}

/// Chunks containing this byte make the worker panic, so tests can drive the failure path.
#[cfg(test)]
pub(crate) const PANIC_ON_BYTE: u8 = 0x07;

/// Per-worker totals.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct WorkerStats {
    pub(crate) chunks: u64,
}

/// Tokenizes chunks until the chunk channel closes or the pipeline is cancelled.
pub(crate) fn run_worker(
    id: usize,
    chunks: Receiver<Chunk>,
    results: Sender<PartialResult>,
    cancel: &CancelToken,
    log_chunks: bool,
) -> Result<WorkerStats> {
    let mut stats = WorkerStats::default();
    loop {
        let chunk = select! {
            recv(chunks) -> chunk => match chunk {
                Ok(chunk) => chunk,
                Err(_) => return Ok(stats),
            },
            recv(cancel.listener()) -> _ => return Err(FreqError::Cancelled),
        };

        #[cfg(test)]
        if chunk.bytes().contains(&PANIC_ON_BYTE) {
            panic!("worker {id} hit the failure byte in chunk {}", chunk.ordinal);
        }

        let started = Instant::now();
        let ordinal = chunk.ordinal;
        let tokens = tokenize_chunk(chunk.bytes());
        let parsed = started.elapsed();

        let wait_start = Instant::now();
        select! {
            send(results, PartialResult { chunk, tokens }) -> sent => {
                if sent.is_err() {
                    return Err(disconnected(cancel, "result channel closed before workers finished"));
                }
            },
            recv(cancel.listener()) -> _ => return Err(FreqError::Cancelled),
        }
        stats.chunks += 1;

        if log_chunks {
            debug!(
                "worker {id} parsed chunk {ordinal} in {parsed:.2?}, waited {:.2?} for the collector",
                wait_start.elapsed()
            );
        }
    }
}
