use std::time::Instant;

use crossbeam_channel::Receiver;
use log::debug;

use crate::cancel::CancelToken;
use crate::frequency::FrequencyTable;
use crate::pool::BufferPool;
use crate::reassembly::BoundaryRecord;

use super::worker::PartialResult;

/// Everything the collector retained once the result channel closed.
#[derive(Debug, Default)]
pub(crate) struct Collected {
    pub(crate) table: FrequencyTable,
    pub(crate) records: Vec<BoundaryRecord>,
    pub(crate) chunks: u64,
    pub(crate) bytes: u64,
}

/// Drains worker results in arrival order until every worker has dropped its sender.
///
/// The collector is the only writer of the global table during this phase. After
/// cancellation it keeps draining, releasing buffers without merging, so no sender stays
/// blocked on a full channel.
pub(crate) fn collect(
    results: Receiver<PartialResult>,
    pool: &BufferPool,
    cancel: &CancelToken,
    log_chunks: bool,
) -> Collected {
    let mut collected = Collected::default();
    for PartialResult { chunk, tokens } in results.iter() {
        if cancel.is_cancelled() {
            pool.release(chunk.into_buffer());
            continue;
        }
        let started = Instant::now();
        let ordinal = chunk.ordinal;
        let record = BoundaryRecord::from_tokens(ordinal, chunk.bytes(), &tokens);
        collected.bytes += chunk.len() as u64;
        collected.chunks += 1;
        pool.release(chunk.into_buffer());

        collected.table.merge(tokens.local);
        collected.records.push(record);

        if log_chunks {
            debug!(
                "merged chunk {ordinal} in {:.2?}; {} distinct words so far",
                started.elapsed(),
                collected.table.len()
            );
        }
    }
    collected
}
