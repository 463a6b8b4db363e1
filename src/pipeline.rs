//! Parallel chunked counting pipeline: source → workers → collector → reassembler → ranker.

mod collector;
mod worker;

use std::fmt;
use std::io::Read;
use std::thread;
use std::time::Instant;

use crossbeam_channel::bounded;
use log::{info, warn};

use crate::cancel::CancelToken;
use crate::chunk::{ChunkSource, SourceStats};
use crate::config::{CounterBuilder, CounterConfig};
use crate::error::{FreqError, Result};
use crate::metrics::PipelineMetrics;
use crate::pool::BufferPool;
use crate::rank::{rank, RankedEntry};
use crate::reassembly::reassemble;

use self::collector::{collect, Collected};
use self::worker::{run_worker, WorkerStats};

/// High-level façade configuring and executing counting runs.
#[derive(Debug, Clone)]
pub struct Counter {
    cfg: CounterConfig,
}

/// Ranking and metrics returned after a run completes.
#[must_use]
#[derive(Debug, Clone)]
pub struct CountReport {
    /// Words ordered by descending frequency, ties by ascending word.
    pub entries: Vec<RankedEntry>,
    /// Detailed metrics captured during the run.
    pub metrics: PipelineMetrics,
}

impl Counter {
    /// Creates a counter for the supplied configuration.
    #[must_use]
    pub fn new(cfg: CounterConfig) -> Self {
        Self { cfg }
    }

    /// Returns a [`CounterBuilder`] with default settings.
    #[must_use]
    pub fn builder() -> CounterBuilder {
        CounterConfig::builder()
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &CounterConfig {
        &self.cfg
    }

    /// Counts every word of `reader` using the parallel chunked pipeline.
    ///
    /// Fails with the first error raised by the reader or a worker; no partial ranking is
    /// returned in that case.
    pub fn count_reader<R: Read + Send>(&self, reader: R) -> Result<CountReport> {
        self.cfg.validate()?;
        let run_start = Instant::now();

        let (collected, source) = self.run_stages(reader)?;
        let collect_duration = run_start.elapsed();

        let Collected {
            mut table,
            records,
            chunks,
            bytes,
        } = collected;
        if chunks != source.chunks || bytes != source.bytes {
            return Err(FreqError::Internal(format!(
                "collected {chunks} chunks / {bytes} bytes but read {} / {}",
                source.chunks, source.bytes
            )));
        }

        let reassemble_start = Instant::now();
        let boundary_words = reassemble(records, &mut table)?;
        let reassemble_duration = reassemble_start.elapsed();

        let total_words = table.total();
        let distinct_words = table.len();
        let rank_start = Instant::now();
        let entries = rank(table);
        let rank_duration = rank_start.elapsed();

        let mut metrics = PipelineMetrics {
            chunks,
            bytes_read: bytes,
            total_words,
            distinct_words,
            boundary_words,
            workers: self.cfg.workers,
            chunk_size: self.cfg.chunk_size,
            collect_duration,
            reassemble_duration,
            rank_duration,
            total_duration: run_start.elapsed(),
            rss_kb: None,
        };
        metrics.sample_rss();
        info!(
            "counted {total_words} words ({distinct_words} distinct) in {chunks} chunks, {bytes} bytes in {:.2?} ({:.2} MiB/s)",
            metrics.total_duration,
            metrics.throughput_mib_s()
        );
        Ok(CountReport { entries, metrics })
    }

    /// Runs the concurrent phase and returns what the collector retained.
    fn run_stages<R: Read + Send>(&self, reader: R) -> Result<(Collected, SourceStats)> {
        let cfg = &self.cfg;
        let cancel = CancelToken::new();
        let pool = BufferPool::new(cfg.pool_size, cfg.chunk_size);

        thread::scope(|scope| {
            let (chunk_tx, chunk_rx) = bounded(cfg.channel_capacity);
            let (result_tx, result_rx) = bounded(cfg.channel_capacity);

            let mut workers = Vec::with_capacity(cfg.workers);
            for id in 0..cfg.workers {
                let chunks = chunk_rx.clone();
                let results = result_tx.clone();
                let cancel = &cancel;
                let spawned = thread::Builder::new()
                    .name(format!("chunkfreq-worker-{id}"))
                    .spawn_scoped(scope, move || {
                        let _guard = cancel.cancel_on_panic();
                        let outcome = run_worker(id, chunks, results, cancel, cfg.log_chunks);
                        if outcome.is_err() {
                            cancel.cancel();
                        }
                        outcome
                    });
                match spawned {
                    Ok(handle) => workers.push(handle),
                    Err(err) => {
                        cancel.cancel();
                        return Err(FreqError::Worker(format!(
                            "failed to spawn worker {id}: {err}"
                        )));
                    }
                }
            }
            drop(chunk_rx);
            drop(result_tx);

            let source = ChunkSource::new(reader, &pool).log_chunks(cfg.log_chunks);
            let reader_handle = thread::Builder::new()
                .name("chunkfreq-reader".into())
                .spawn_scoped(scope, || {
                    let _guard = cancel.cancel_on_panic();
                    let outcome = source.run(chunk_tx, &cancel);
                    if outcome.is_err() {
                        cancel.cancel();
                    }
                    outcome
                });
            let reader_handle = match reader_handle {
                Ok(handle) => handle,
                Err(err) => {
                    cancel.cancel();
                    return Err(FreqError::Worker(format!("failed to spawn reader: {err}")));
                }
            };

            let collected = collect(result_rx, &pool, &cancel, cfg.log_chunks);

            let mut first_error: Option<FreqError> = None;
            let source_stats = match reader_handle.join() {
                Ok(Ok(stats)) => Some(stats),
                Ok(Err(err)) => {
                    record_error(&mut first_error, err);
                    None
                }
                Err(_) => {
                    record_error(&mut first_error, FreqError::Worker("reader panicked".into()));
                    None
                }
            };
            let mut parsed = 0u64;
            for (id, handle) in workers.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(WorkerStats { chunks })) => parsed += chunks,
                    Ok(Err(err)) => record_error(&mut first_error, err),
                    Err(_) => record_error(
                        &mut first_error,
                        FreqError::Worker(format!("worker {id} panicked")),
                    ),
                }
            }

            if let Some(err) = first_error {
                warn!("counting aborted: {err}");
                return Err(err);
            }
            let source_stats = source_stats
                .ok_or_else(|| FreqError::Internal("reader finished without totals".into()))?;
            if parsed != source_stats.chunks {
                return Err(FreqError::Internal(format!(
                    "workers parsed {parsed} chunks but {} were read",
                    source_stats.chunks
                )));
            }
            Ok((collected, source_stats))
        })
    }
}

/// Keeps the first real error; a `Cancelled` marker only counts when nothing else failed.
fn record_error(slot: &mut Option<FreqError>, err: FreqError) {
    match slot {
        None => *slot = Some(err),
        Some(existing) if existing.is_cancelled() && !err.is_cancelled() => *slot = Some(err),
        Some(_) => {}
    }
}

/// Counts and ranks every word of `reader` with the given configuration.
pub fn count_frequencies<R: Read + Send>(
    reader: R,
    cfg: &CounterConfig,
) -> Result<Vec<RankedEntry>> {
    Counter::new(cfg.clone())
        .count_reader(reader)
        .map(|report| report.entries)
}

impl fmt::Display for CountReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics;
        writeln!(
            f,
            "{} distinct words, {} total ({} joined across chunk boundaries)",
            m.distinct_words, m.total_words, m.boundary_words
        )?;
        writeln!(
            f,
            "{} chunks of up to {} bytes across {} workers, {} bytes read",
            m.chunks, m.chunk_size, m.workers, m.bytes_read
        )?;
        write!(
            f,
            "collect {:.2?} | reassemble {:.2?} | rank {:.2?} | total {:.2?}",
            m.collect_duration, m.reassemble_duration, m.rank_duration, m.total_duration
        )?;
        if let Some(kb) = m.rss_kb {
            write!(f, " | rss {kb} KiB")?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequential::count_sequential;
    use std::io::{self, Cursor};

    fn counter(chunk_size: usize, workers: usize) -> Counter {
        let cfg = CounterConfig::builder()
            .chunk_size(chunk_size)
            .workers(workers)
            .build()
            .unwrap();
        Counter::new(cfg)
    }

    /// Serves `good` bytes, then fails.
    struct FailAfter {
        good: Cursor<Vec<u8>>,
    }

    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.good.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::BrokenPipe, "upstream vanished")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn mixed_case_sentence_with_small_chunks() {
        let report = counter(5, 2)
            .count_reader(Cursor::new("The cat sat. THE CAT SAT."))
            .unwrap();
        assert_eq!(
            report.entries,
            vec![
                RankedEntry::new("cat", 2),
                RankedEntry::new("sat.", 2),
                RankedEntry::new("the", 2),
            ]
        );
        assert_eq!(report.metrics.chunks, 5);
        assert_eq!(report.metrics.total_words, 6);
    }

    #[test]
    fn empty_input_yields_empty_ranking() {
        let report = counter(64, 4).count_reader(io::empty()).unwrap();
        assert!(report.entries.is_empty());
        assert_eq!(report.metrics.chunks, 0);
    }

    #[test]
    fn repeated_word_across_worker_counts() {
        let input = "aaaa ".repeat(200_000);
        for workers in [1, 4, 16] {
            let report = counter(64 << 10, workers)
                .count_reader(Cursor::new(input.as_bytes()))
                .unwrap();
            assert_eq!(report.entries, vec![RankedEntry::new("aaaa", 200_000)]);
            assert_eq!(report.metrics.bytes_read, 1_000_000);
        }
    }

    #[test]
    fn matches_sequential_on_varied_text() {
        let text = "Lorem ipsum dolor sit amet,\tconsectetur\u{2003}adipiscing elit.\n\
                    Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. \
                    LOREM Ipsum \u{00C9}t\u{00E9} caf\u{00E9}\u{00A0}CAF\u{00C9} \u{1F600}\u{1F600}";
        let expected = count_sequential(Cursor::new(text)).unwrap();
        for chunk_size in [1, 2, 3, 5, 7, 16, 64, 4096] {
            for workers in [1, 3] {
                let got = counter(chunk_size, workers)
                    .count_reader(Cursor::new(text))
                    .unwrap();
                assert_eq!(got.entries, expected, "chunk_size={chunk_size} workers={workers}");
            }
        }
    }

    #[test]
    fn single_buffer_pool_still_progresses() {
        let cfg = CounterConfig::builder()
            .chunk_size(3)
            .workers(4)
            .pool_size(1)
            .channel_capacity(1)
            .build()
            .unwrap();
        let entries = count_frequencies(Cursor::new("a bb a ccc bb a"), &cfg).unwrap();
        assert_eq!(
            entries,
            vec![
                RankedEntry::new("a", 3),
                RankedEntry::new("bb", 2),
                RankedEntry::new("ccc", 1),
            ]
        );
    }

    #[test]
    fn read_error_aborts_the_run() {
        let reader = FailAfter {
            good: Cursor::new(b"some words before the failure ".repeat(100)),
        };
        let err = counter(16, 4).count_reader(reader).expect_err("read fails");
        match err {
            FreqError::Io { source, .. } => assert_eq!(source.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn worker_panic_aborts_the_run() {
        let mut input = b"alpha beta gamma ".repeat(64);
        input.push(super::worker::PANIC_ON_BYTE);
        input.extend_from_slice(&b" delta epsilon ".repeat(64));

        for (workers, pool_size, capacity) in [(1, 1, 1), (3, 1, 1), (4, 2, 1), (2, 6, 2)] {
            let cfg = CounterConfig::builder()
                .chunk_size(5)
                .workers(workers)
                .pool_size(pool_size)
                .channel_capacity(capacity)
                .build()
                .unwrap();
            let (done_tx, done_rx) = crossbeam_channel::bounded(1);
            let bytes = input.clone();
            std::thread::spawn(move || {
                let outcome = Counter::new(cfg).count_reader(Cursor::new(bytes));
                let _ = done_tx.send(outcome.map(|report| report.entries));
            });
            let outcome = done_rx
                .recv_timeout(std::time::Duration::from_secs(30))
                .expect("pipeline finished after the worker panic");
            match outcome {
                Err(FreqError::Worker(message)) => {
                    assert!(message.contains("panicked"), "{message}");
                }
                other => panic!(
                    "workers={workers} pool={pool_size} capacity={capacity}: unexpected {other:?}"
                ),
            }
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = CounterConfig {
            chunk_size: 0,
            ..CounterConfig::default()
        };
        let err = Counter::new(cfg).count_reader(io::empty()).expect_err("invalid");
        assert!(matches!(err, FreqError::InvalidConfig(_)));
    }

    #[test]
    fn record_error_prefers_real_failures() {
        let mut slot = None;
        record_error(&mut slot, FreqError::Cancelled);
        record_error(&mut slot, FreqError::Worker("boom".into()));
        record_error(&mut slot, FreqError::Internal("later".into()));
        assert!(matches!(slot, Some(FreqError::Worker(_))));
    }
}
