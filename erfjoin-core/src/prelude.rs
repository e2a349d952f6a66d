//! Convenient re-exports for common usage.
//!
//! # Example
//!
//! ```rust,no_run
//! use erfjoin_core::prelude::*;
//!
//! let source = CaptureSource::open("tap0.erf").unwrap();
//! let first = source.capture().record(0);
//! println!("first packet at {} ns", first.timestamp_ns());
//! ```

// Capture types
pub use crate::capture::Capture;
pub use crate::erf::{RecordView, RECORD_LEN};
pub use crate::io::CaptureSource;

// Join types
pub use crate::join::{
    join_sharded, Correlator, DiscardSink, JoinConfig, MatchOutcome, OutcomeSink, RunCounters,
};

// Output types
pub use crate::output::{EmitPolicy, JoinRecord, JoinRecordReader, JoinRecordWriter};
pub use crate::report::LatencySummary;

// Error types
pub use crate::error::{Error, Result};
