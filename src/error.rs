//! Error handling utilities shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result type used throughout the crate.
pub type Result<T, E = FreqError> = std::result::Result<T, E>;

/// Domain-specific error describing failures during configuration, IO, or counting.
#[derive(Debug, Error)]
pub enum FreqError {
    /// Counter configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Reading the input stream failed with something other than end-of-stream.
    #[error("io error while reading {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Input path associated with the failure when known.
        path: Option<PathBuf>,
    },
    /// A pipeline thread failed or panicked.
    #[error("worker failure: {0}")]
    Worker(String),
    /// The task observed the shared cancellation signal and stopped early.
    #[error("pipeline cancelled")]
    Cancelled,
    /// A result record file could not be parsed.
    #[error("record line {line}: {message}")]
    Record {
        /// 1-based line number of the offending record.
        line: usize,
        /// Description of what was wrong with the record.
        message: String,
    },
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Catch-all variant for invariants that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for FreqError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<csv::Error> for FreqError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|pos| pos.line() as usize);
        match (err.into_kind(), line) {
            (csv::ErrorKind::Io(source), _) => Self::io(source, None),
            (csv::ErrorKind::Deserialize { err, .. }, Some(line)) => Self::Record {
                line,
                message: err.to_string(),
            },
            (
                csv::ErrorKind::UnequalLengths {
                    expected_len, len, ..
                },
                Some(line),
            ) => Self::Record {
                line,
                message: format!("expected {expected_len} fields, found {len}"),
            },
            (kind, _) => Self::Serialization(format!("{kind:?}")),
        }
    }
}

impl FreqError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }

    /// Returns true for the cancellation marker produced by tasks that stopped early.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
