//! The join engine.
//!
//! For every record of the reference capture, find the identical packet in
//! the comparison capture within a time window, classify the outcome and
//! compute latency.
//!
//! ```text
//!  reference[i] --decode--> t0
//!        |
//!        +-- t0 - window > comparison.last ? --> PrunedOutOfTime
//!        |
//!        +-- [t0 - guard, t0 + window] --IndexCursor--> [lo, hi]
//!                                                          |
//!              scan lo..=hi for identical identity bytes --+--> Matched
//!                                                          +--> Dropped{Before,After}FirstMatch
//! ```
//!
//! - `locate` - nearest-timestamp walk and the two-hint cursor
//! - `correlator` - the per-run state and the join loop
//! - `outcome` - outcomes, counters and the sink trait
//! - `shard` - splitting the reference range across threads

mod correlator;
pub mod locate;
mod outcome;
mod shard;

use std::ops::Range;

pub use correlator::Correlator;
pub use locate::{locate_nearest, IndexCursor, Located};
pub use outcome::{DiscardSink, MatchOutcome, OutcomeSink, RunCounters, SearchStats};
pub use shard::{join_sharded, ShardResult};

/// Default search window in microseconds.
pub const DEFAULT_WINDOW_US: u64 = 2500;

/// How far before the reference timestamp the search window opens.
///
/// Tap clocks agree to about 100 ns; a copy seen more than this much
/// earlier than the original is not the same packet.
pub const DEFAULT_GUARD_NS: u64 = 250;

/// Parameters of one join run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JoinConfig {
    /// How long after the reference timestamp a match may appear (ns)
    pub window_ns: u64,
    /// First reference record to process
    pub offset: u64,
    /// Number of reference records to process; negative means to the end
    pub length: i64,
    /// How long before the reference timestamp a match may appear (ns)
    pub guard_ns: u64,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self::from_window_us(DEFAULT_WINDOW_US)
    }
}

impl JoinConfig {
    /// Whole-capture join with the given window in nanoseconds.
    pub fn new(window_ns: u64) -> Self {
        Self {
            window_ns,
            offset: 0,
            length: -1,
            guard_ns: DEFAULT_GUARD_NS,
        }
    }

    /// Whole-capture join with the given window in microseconds.
    pub fn from_window_us(window_us: u64) -> Self {
        Self::new(window_us.saturating_mul(1000))
    }

    /// Restrict the join to `length` records starting at `offset`.
    pub fn with_range(mut self, offset: u64, length: i64) -> Self {
        self.offset = offset;
        self.length = length;
        self
    }

    /// Override the backward guard band.
    pub fn with_guard_ns(mut self, guard_ns: u64) -> Self {
        self.guard_ns = guard_ns;
        self
    }

    /// The reference index range this config selects in a capture of
    /// `len` records.
    ///
    /// Out-of-range requests are truncated, never rejected, so shard
    /// boundaries can be computed without knowing the capture size.
    pub fn clamp(&self, len: usize) -> Range<usize> {
        let n = len as u64;
        let end = if self.length < 0 {
            n
        } else {
            self.offset.saturating_add(self.length as u64).min(n)
        };
        let start = self.offset.min(n);
        start as usize..end as usize
    }

    #[inline]
    pub(crate) fn window_i64(&self) -> i64 {
        i64::try_from(self.window_ns).unwrap_or(i64::MAX)
    }

    #[inline]
    pub(crate) fn guard_i64(&self) -> i64 {
        i64::try_from(self.guard_ns).unwrap_or(i64::MAX)
    }
}
