//! Parallel chunked word-frequency counting library and CLI.
//!
//! The crate exposes both a library API and a `chunkfreq` command line interface. Input
//! is split into fixed-size chunks that a pool of workers tokenizes concurrently; words
//! cut by a chunk boundary are stitched back together afterwards, so the ranking always
//! matches a single sequential pass over the same bytes.
//!
//! ```no_run
//! use chunkfreq::{Counter, CounterConfig};
//!
//! # fn main() -> chunkfreq::Result<()> {
//! let cfg = CounterConfig::builder()
//!     .chunk_size(1 << 20)
//!     .workers(8)
//!     .build()?;
//! let file = std::fs::File::open("/path/to/corpus.txt")
//!     .map_err(|err| chunkfreq::FreqError::io(err, None))?;
//! let report = Counter::new(cfg).count_reader(file)?;
//! for entry in report.entries.iter().take(10) {
//!     println!("{entry}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature. Users targeting the library
//! portion only can disable default features to avoid the CLI dependencies:
//! `chunkfreq = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::multiple_crate_versions
)]

pub mod cancel;
pub mod chunk;
pub mod config;
pub mod error;
pub mod frequency;
pub mod metrics;
pub mod pipeline;
pub mod pool;
pub mod rank;
pub mod reassembly;
pub mod sequential;
pub mod serialization;
pub mod tokenizer;

pub use config::{CounterBuilder, CounterConfig, DEFAULT_CHUNK_SIZE};
pub use error::{FreqError, Result};
pub use frequency::FrequencyTable;
pub use metrics::PipelineMetrics;
pub use pipeline::{count_frequencies, CountReport, Counter};
pub use rank::RankedEntry;
pub use sequential::count_sequential;
