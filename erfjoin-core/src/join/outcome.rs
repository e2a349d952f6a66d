//! Join outcomes, run counters and output sinks.

use std::iter::Sum;
use std::ops::AddAssign;

use crate::erf::RecordView;
use crate::error::Error;

/// Classification of one reference record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchOutcome {
    /// An identical packet was found in the comparison capture
    Matched {
        ref_idx: u64,
        cmp_idx: u64,
        latency_ns: i64,
    },
    /// No match, and the run has not yet seen enough matches to call it loss
    DroppedBeforeFirstMatch,
    /// No match after the run started matching: the packet was lost
    DroppedAfterFirstMatch,
    /// Reference time is past the comparison capture's horizon; not searched
    PrunedOutOfTime,
}

impl MatchOutcome {
    /// Whether this is a match.
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchOutcome::Matched { .. })
    }

    /// Latency of a match.
    pub fn latency_ns(&self) -> Option<i64> {
        match self {
            MatchOutcome::Matched { latency_ns, .. } => Some(*latency_ns),
            _ => None,
        }
    }

    /// Matched comparison index.
    pub fn cmp_idx(&self) -> Option<u64> {
        match self {
            MatchOutcome::Matched { cmp_idx, .. } => Some(*cmp_idx),
            _ => None,
        }
    }

    /// Stable lowercase label, used in exports.
    pub fn label(&self) -> &'static str {
        match self {
            MatchOutcome::Matched { .. } => "matched",
            MatchOutcome::DroppedBeforeFirstMatch => "dropped_before_match",
            MatchOutcome::DroppedAfterFirstMatch => "dropped_after_match",
            MatchOutcome::PrunedOutOfTime => "pruned_out_of_time",
        }
    }
}

impl std::fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-run outcome counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub total_matched: u64,
    pub total_dropped_before_match: u64,
    pub total_dropped_after_match: u64,
    pub total_pruned_out_of_time: u64,
}

impl RunCounters {
    /// Count one outcome.
    #[inline]
    pub fn record(&mut self, outcome: &MatchOutcome) {
        match outcome {
            MatchOutcome::Matched { .. } => self.total_matched += 1,
            MatchOutcome::DroppedBeforeFirstMatch => self.total_dropped_before_match += 1,
            MatchOutcome::DroppedAfterFirstMatch => self.total_dropped_after_match += 1,
            MatchOutcome::PrunedOutOfTime => self.total_pruned_out_of_time += 1,
        }
    }

    /// Sum of all four counters: the number of records processed.
    pub fn total(&self) -> u64 {
        self.total_matched
            + self.total_dropped_before_match
            + self.total_dropped_after_match
            + self.total_pruned_out_of_time
    }

    /// Add another run's counters to these.
    pub fn merge(&mut self, other: &RunCounters) {
        self.total_matched += other.total_matched;
        self.total_dropped_before_match += other.total_dropped_before_match;
        self.total_dropped_after_match += other.total_dropped_after_match;
        self.total_pruned_out_of_time += other.total_pruned_out_of_time;
    }

    /// Fraction of searched records that were lost after matching started.
    pub fn loss_ratio(&self) -> Option<f64> {
        let observed = self.total_matched + self.total_dropped_after_match;
        (observed > 0).then(|| self.total_dropped_after_match as f64 / observed as f64)
    }
}

impl AddAssign for RunCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}

impl Sum for RunCounters {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, c| {
            acc += c;
            acc
        })
    }
}

/// Work done by the search, for tuning and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Locator invocations (two per searched record)
    pub locate_calls: u64,
    /// Timestamps evaluated by the locator walks
    pub probes: u64,
    /// Candidate records compared byte-for-byte
    pub comparisons: u64,
}

impl AddAssign for SearchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.locate_calls += rhs.locate_calls;
        self.probes += rhs.probes;
        self.comparisons += rhs.comparisons;
    }
}

/// Receives one outcome per processed reference record, in index order.
///
/// Sinks are the only fallible part of a join.
pub trait OutcomeSink {
    /// Accept the outcome for reference record `ref_idx`.
    fn emit(
        &mut self,
        ref_idx: u64,
        reference: RecordView<'_>,
        outcome: &MatchOutcome,
    ) -> Result<(), Error>;

    /// Called once after the last record of a run.
    fn finish(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Sink that drops every outcome (counters only).
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardSink;

impl OutcomeSink for DiscardSink {
    #[inline]
    fn emit(&mut self, _: u64, _: RecordView<'_>, _: &MatchOutcome) -> Result<(), Error> {
        Ok(())
    }
}

impl OutcomeSink for Vec<MatchOutcome> {
    fn emit(&mut self, _: u64, _: RecordView<'_>, outcome: &MatchOutcome) -> Result<(), Error> {
        self.push(*outcome);
        Ok(())
    }
}

impl<S: OutcomeSink + ?Sized> OutcomeSink for &mut S {
    #[inline]
    fn emit(
        &mut self,
        ref_idx: u64,
        reference: RecordView<'_>,
        outcome: &MatchOutcome,
    ) -> Result<(), Error> {
        (**self).emit(ref_idx, reference, outcome)
    }

    fn finish(&mut self) -> Result<(), Error> {
        (**self).finish()
    }
}

impl<S: OutcomeSink + ?Sized> OutcomeSink for Box<S> {
    #[inline]
    fn emit(
        &mut self,
        ref_idx: u64,
        reference: RecordView<'_>,
        outcome: &MatchOutcome,
    ) -> Result<(), Error> {
        (**self).emit(ref_idx, reference, outcome)
    }

    fn finish(&mut self) -> Result<(), Error> {
        (**self).finish()
    }
}

/// Tee: both sinks see every outcome.
impl<A: OutcomeSink, B: OutcomeSink> OutcomeSink for (A, B) {
    #[inline]
    fn emit(
        &mut self,
        ref_idx: u64,
        reference: RecordView<'_>,
        outcome: &MatchOutcome,
    ) -> Result<(), Error> {
        self.0.emit(ref_idx, reference, outcome)?;
        self.1.emit(ref_idx, reference, outcome)
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.0.finish()?;
        self.1.finish()
    }
}
