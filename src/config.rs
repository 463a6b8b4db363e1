//! Configuration builders controlling the chunked counting pipeline.

use crate::error::{FreqError, Result};
use serde::{Deserialize, Serialize};

/// Default chunk size read from the input stream per pipeline step (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 << 10;

/// Configuration for the parallel chunked counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CounterConfig {
    /// Size in bytes of every pooled chunk buffer.
    pub chunk_size: usize,
    /// Number of tokenizer worker threads.
    pub workers: usize,
    /// Number of chunk buffers in circulation; bounds peak memory to `pool_size * chunk_size`.
    pub pool_size: usize,
    /// Capacity of the chunk and result hand-off channels.
    pub channel_capacity: usize,
    /// Emits per-chunk timings at `debug` level through the `log` facade.
    pub log_chunks: bool,
}

impl CounterConfig {
    /// Returns a builder initialised with [`CounterConfig::default`].
    #[must_use]
    pub fn builder() -> CounterBuilder {
        CounterBuilder::default()
    }

    /// Validates the invariants required by the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(FreqError::InvalidConfig(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if self.workers == 0 {
            return Err(FreqError::InvalidConfig(
                "workers must be greater than zero".into(),
            ));
        }
        if self.pool_size == 0 {
            return Err(FreqError::InvalidConfig(
                "pool_size must be greater than zero".into(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(FreqError::InvalidConfig(
                "channel_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        let workers = num_cpus::get().max(1);
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers,
            pool_size: default_pool_size(workers),
            channel_capacity: workers,
            log_chunks: false,
        }
    }
}

/// Enough buffers for every worker to hold one chunk while another waits in each channel.
fn default_pool_size(workers: usize) -> usize {
    workers.saturating_mul(2).saturating_add(2)
}

/// Builder for [`CounterConfig`].
#[derive(Debug, Default, Clone)]
pub struct CounterBuilder {
    cfg: CounterConfig,
    pool_size_set: bool,
    channel_capacity_set: bool,
}

impl CounterBuilder {
    /// Sets the chunk size in bytes.
    #[must_use]
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.cfg.chunk_size = bytes;
        self
    }

    /// Sets the number of worker threads.
    ///
    /// Unless overridden explicitly, the pool size and channel capacity follow the worker count.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.cfg.workers = workers;
        self
    }

    /// Overrides the number of pooled chunk buffers.
    #[must_use]
    pub fn pool_size(mut self, buffers: usize) -> Self {
        self.cfg.pool_size = buffers;
        self.pool_size_set = true;
        self
    }

    /// Overrides the capacity of the hand-off channels.
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.cfg.channel_capacity = capacity;
        self.channel_capacity_set = true;
        self
    }

    /// Enables or disables per-chunk debug logging.
    #[must_use]
    pub fn log_chunks(mut self, enabled: bool) -> Self {
        self.cfg.log_chunks = enabled;
        self
    }

    /// Finalises the builder, returning a validated [`CounterConfig`].
    pub fn build(mut self) -> Result<CounterConfig> {
        if !self.pool_size_set {
            self.cfg.pool_size = default_pool_size(self.cfg.workers);
        }
        if !self.channel_capacity_set {
            self.cfg.channel_capacity = self.cfg.workers.max(1);
        }
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_host_parallelism() {
        let cfg = CounterConfig::default();
        assert_eq!(cfg.chunk_size, 64 * 1024);
        assert_eq!(cfg.workers, num_cpus::get().max(1));
        assert_eq!(cfg.pool_size, cfg.workers * 2 + 2);
        cfg.validate().expect("default config is valid");
    }

    #[test]
    fn builder_derives_pool_from_workers() {
        let cfg = CounterConfig::builder()
            .workers(3)
            .chunk_size(16)
            .build()
            .expect("config should be valid");
        assert_eq!(cfg.pool_size, 8);
        assert_eq!(cfg.channel_capacity, 3);
        assert_eq!(cfg.chunk_size, 16);
    }

    #[test]
    fn explicit_pool_size_survives_worker_change() {
        let cfg = CounterConfig::builder()
            .pool_size(1)
            .workers(8)
            .build()
            .expect("config should be valid");
        assert_eq!(cfg.pool_size, 1);
    }

    #[test]
    fn validate_rejects_zero_chunk_size() {
        let err = CounterConfig::builder()
            .chunk_size(0)
            .build()
            .expect_err("validation should fail");
        assert!(matches!(
            err,
            FreqError::InvalidConfig(message) if message.contains("chunk_size")
        ));
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let cfg = CounterConfig {
            workers: 0,
            ..CounterConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
