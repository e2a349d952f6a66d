//! # erfjoin-core
//!
//! Two-capture ERF correlation engine.
//!
//! Given the same traffic captured at two taps, this crate pairs every
//! packet of the reference capture with its identical copy in the
//! comparison capture, within a time window, and reports per-packet
//! latency and loss. It has no CLI dependencies and can be embedded in
//! other analysis tools.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use erfjoin_core::prelude::*;
//!
//! let reference = CaptureSource::open("tap0.erf").unwrap();
//! let comparison = CaptureSource::open("tap1.erf.gz").unwrap();
//!
//! let config = JoinConfig::from_window_us(2500);
//! let mut summary = LatencySummary::new();
//! let counters = Correlator::new()
//!     .join(reference.capture(), comparison.capture(), &config, &mut summary)
//!     .unwrap();
//!
//! println!("{} matched, {} lost", counters.total_matched, counters.total_dropped_after_match);
//! println!("p99 latency: {:?} ns", summary.quantile(0.99));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        erfjoin-core                                 |
//! +---------------------------------------------------------------------+
//! |  erf/      - Record layout, RecordView, timestamp decoding          |
//! |  capture   - Validated strided view over a capture buffer           |
//! |  io/       - CaptureSource: read, mmap, gzip/zstd                   |
//! |  join/     - Locator, Correlator, outcomes, sharded joins           |
//! |  output/   - 112-byte join records: writer and reader               |
//! |  report    - HdrHistogram latency summary                           |
//! |  error     - Error types                                            |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Crate Features
//!
//! - `default` - mmap, gzip and zstd enabled
//! - `mmap` - Memory-mapped capture loading
//! - `compress-gzip` - Gzip decompression support
//! - `compress-zstd` - Zstd decompression support
//! - `compress-all` - All compression formats

pub mod capture;
pub mod erf;
pub mod error;
pub mod io;
pub mod join;
pub mod output;
pub mod prelude;
pub mod report;

// Re-export commonly used types at crate root for convenience
pub use capture::Capture;
pub use erf::{ErfRecordBuilder, RecordView, RECORD_LEN};
pub use error::{CaptureError, Error, JoinRecordError, Result};
pub use io::{CaptureMetadata, CaptureSource, Compression};
pub use join::{
    join_sharded, locate_nearest, Correlator, DiscardSink, IndexCursor, JoinConfig, Located,
    MatchOutcome, OutcomeSink, RunCounters, SearchStats, ShardResult, DEFAULT_GUARD_NS,
    DEFAULT_WINDOW_US,
};
pub use output::{
    EmitPolicy, JoinRecord, JoinRecordReader, JoinRecordWriter, JOIN_RECORD_LEN, NO_LATENCY,
    NO_MATCH,
};
pub use report::{LatencyStats, LatencySummary};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
