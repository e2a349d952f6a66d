//! The join loop.

use std::ops::Range;

use crate::capture::Capture;
use crate::error::Error;

use super::locate::IndexCursor;
use super::outcome::{MatchOutcome, OutcomeSink, RunCounters, SearchStats};
use super::JoinConfig;

/// State of one join run: the locator hints, the outcome counters and the
/// search statistics.
///
/// Nothing here is shared. Parallel joins use one `Correlator` per shard.
#[derive(Clone, Debug, Default)]
pub struct Correlator {
    cursor: IndexCursor,
    counters: RunCounters,
    stats: SearchStats,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters of the last (or current) run.
    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    /// Search statistics of the last run.
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Locator hints as left by the last run.
    pub fn cursor(&self) -> &IndexCursor {
        &self.cursor
    }

    /// Join the configured slice of `reference` against `comparison`.
    ///
    /// Emits exactly one outcome per processed reference record, in index
    /// order, and returns the run's counters. State from a previous run is
    /// discarded first, so repeated calls over the same inputs produce
    /// identical output. The only errors come from `sink`.
    pub fn join<S: OutcomeSink + ?Sized>(
        &mut self,
        reference: &Capture,
        comparison: &Capture,
        config: &JoinConfig,
        sink: &mut S,
    ) -> Result<RunCounters, Error> {
        let range = config.clamp(reference.len());
        self.join_range(reference, comparison, config, range, sink)
    }

    /// Join an already clamped reference range.
    pub(crate) fn join_range<S: OutcomeSink + ?Sized>(
        &mut self,
        reference: &Capture,
        comparison: &Capture,
        config: &JoinConfig,
        range: Range<usize>,
        sink: &mut S,
    ) -> Result<RunCounters, Error> {
        self.cursor.reset();
        self.counters = RunCounters::default();
        self.stats = SearchStats::default();

        if range.is_empty() {
            tracing::warn!(
                offset = config.offset,
                length = config.length,
                records = reference.len(),
                "requested range selects no reference records"
            );
        }

        tracing::debug!(
            start = range.start,
            end = range.end,
            comparison = comparison.len(),
            window_ns = config.window_ns,
            "join started"
        );

        // Checked once per run rather than once per record.
        let horizon_ns = comparison.last_timestamp_ns() as i64;

        for ref_idx in range {
            let outcome = self.classify(reference, comparison, config, ref_idx, horizon_ns);
            self.counters.record(&outcome);
            sink.emit(ref_idx as u64, reference.record(ref_idx), &outcome)?;
        }
        sink.finish()?;

        tracing::debug!(
            matched = self.counters.total_matched,
            dropped_before = self.counters.total_dropped_before_match,
            dropped_after = self.counters.total_dropped_after_match,
            pruned = self.counters.total_pruned_out_of_time,
            probes = self.stats.probes,
            "join finished"
        );

        Ok(self.counters)
    }

    fn classify(
        &mut self,
        reference: &Capture,
        comparison: &Capture,
        config: &JoinConfig,
        ref_idx: usize,
        horizon_ns: i64,
    ) -> MatchOutcome {
        let record = reference.record(ref_idx);
        let t0 = record.timestamp_ns() as i64;
        let window = config.window_i64();

        // Past the comparison capture's horizon nothing can match.
        if t0.saturating_sub(window) > horizon_ns {
            return MatchOutcome::PrunedOutOfTime;
        }

        let start_ns = t0.saturating_sub(config.guard_i64());
        let end_ns = t0.saturating_add(window);
        let ((lo, hi), probes) = self.cursor.range(
            comparison.len(),
            |i| comparison.timestamp_ns(i),
            start_ns,
            end_ns,
        );
        self.stats.locate_calls += 2;
        self.stats.probes += probes;

        for cmp_idx in lo..=hi {
            self.stats.comparisons += 1;
            let candidate = comparison.record(cmp_idx);
            if candidate.same_packet(&record) {
                return MatchOutcome::Matched {
                    ref_idx: ref_idx as u64,
                    cmp_idx: cmp_idx as u64,
                    latency_ns: (candidate.timestamp_ns() as i64).saturating_sub(t0),
                };
            }
        }

        // Misses before the run has matched more than once are treated as
        // start-of-capture skew, not loss.
        if self.counters.total_matched > 1 {
            MatchOutcome::DroppedAfterFirstMatch
        } else {
            MatchOutcome::DroppedBeforeFirstMatch
        }
    }
}
