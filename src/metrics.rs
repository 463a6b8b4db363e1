//! Metrics describing a counting run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Aggregate metrics produced by one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineMetrics {
    /// Number of chunks read from the input.
    pub chunks: u64,
    /// Number of bytes read from the input.
    pub bytes_read: u64,
    /// Total word occurrences counted.
    pub total_words: u64,
    /// Number of distinct words.
    pub distinct_words: usize,
    /// Words counted by the boundary reassembler rather than by a worker.
    pub boundary_words: u64,
    /// Worker threads used.
    pub workers: usize,
    /// Chunk size in bytes.
    pub chunk_size: usize,
    /// Time spent until every chunk result was collected.
    pub collect_duration: Duration,
    /// Time spent stitching boundary fragments.
    pub reassemble_duration: Duration,
    /// Time spent ranking the table.
    pub rank_duration: Duration,
    /// Wall-clock time of the whole run.
    pub total_duration: Duration,
    /// Resident set size sample captured from `/proc/self/status` on Linux.
    pub rss_kb: Option<usize>,
}

impl PipelineMetrics {
    /// Input throughput in MiB per second, or zero for an instantaneous run.
    #[must_use]
    pub fn throughput_mib_s(&self) -> f64 {
        let secs = self.total_duration.as_secs_f64();
        if secs > 0.0 {
            self.bytes_read as f64 / (1024.0 * 1024.0) / secs
        } else {
            0.0
        }
    }

    /// Records the current resident set size; left as `None` off Linux.
    pub fn sample_rss(&mut self) {
        self.rss_kb = resident_kb();
    }
}

/// Parses the `VmRSS:` line of a `/proc/<pid>/status` document, in KiB.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<usize> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.trim().trim_end_matches("kB").trim().parse().ok())
}

#[cfg(target_os = "linux")]
fn resident_kb() -> Option<usize> {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .as_deref()
        .and_then(parse_vm_rss)
}

#[cfg(not(target_os = "linux"))]
fn resident_kb() -> Option<usize> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vm_rss_line() {
        let status = "Name:\tchunkfreq\nVmPeak:\t  9000 kB\nVmRSS:\t    4242 kB\nThreads:\t3\n";
        assert_eq!(parse_vm_rss(status), Some(4242));
        assert_eq!(parse_vm_rss("Name:\tx\n"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn sample_rss_reads_own_process() {
        let mut metrics = PipelineMetrics::default();
        metrics.sample_rss();
        assert!(metrics.rss_kb.is_some_and(|kb| kb > 0));
    }

    #[test]
    fn throughput_handles_zero_duration() {
        let metrics = PipelineMetrics {
            bytes_read: 1024,
            ..PipelineMetrics::default()
        };
        assert_eq!(metrics.throughput_mib_s(), 0.0);
    }

    #[test]
    fn throughput_is_mib_per_second() {
        let metrics = PipelineMetrics {
            bytes_read: 4 * 1024 * 1024,
            total_duration: Duration::from_secs(2),
            ..PipelineMetrics::default()
        };
        assert!((metrics.throughput_mib_s() - 2.0).abs() < f64::EPSILON);
    }
}
