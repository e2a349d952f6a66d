//! Parallel joins over disjoint slices of the reference capture.
//!
//! Each shard gets its own [`Correlator`] (cursor, counters) and its own
//! sink; both captures are shared read-only. This is the in-process form of
//! running one join per `--offset/--length` slice, and it has the same
//! semantics: in particular, the "more than one match" threshold that
//! separates start-of-capture skew from loss is evaluated per shard.

use std::ops::Range;
use std::thread;

use crate::capture::Capture;
use crate::error::Error;

use super::correlator::Correlator;
use super::outcome::{OutcomeSink, RunCounters, SearchStats};
use super::JoinConfig;

/// What one shard produced.
#[derive(Debug)]
pub struct ShardResult<S> {
    /// Position of the shard in range order
    pub index: usize,
    /// Reference records the shard processed
    pub range: Range<usize>,
    /// The shard's sink, after `finish`
    pub sink: S,
    /// The shard's counters
    pub counters: RunCounters,
    /// The shard's search statistics
    pub stats: SearchStats,
}

impl JoinConfig {
    /// Split the selected reference range into at most `max_shards`
    /// contiguous, disjoint, non-empty ranges of near-equal size.
    ///
    /// An empty selection yields a single empty range.
    pub fn shards(&self, len: usize, max_shards: usize) -> Vec<Range<usize>> {
        let range = self.clamp(len);
        let total = range.len();
        if total == 0 {
            return vec![range];
        }

        let n = max_shards.clamp(1, total);
        let chunk = total.div_ceil(n);
        (range.start..range.end)
            .step_by(chunk)
            .map(|start| start..(start + chunk).min(range.end))
            .collect()
    }
}

/// Join the selected reference range on up to `max_shards` threads.
///
/// `make_sink` builds the sink for each shard from its index and range.
/// Results come back in range order, and the shards' outputs concatenate to
/// one outcome per selected reference record, in index order.
///
/// Each shard starts with fresh counters, so a miss before a shard's second
/// match is `DroppedBeforeFirstMatch` even when a single-threaded run would
/// call it `DroppedAfterFirstMatch`. Matches, latencies and pruning are
/// the same as a single-threaded run.
pub fn join_sharded<S, F>(
    reference: &Capture,
    comparison: &Capture,
    config: &JoinConfig,
    max_shards: usize,
    make_sink: F,
) -> Result<Vec<ShardResult<S>>, Error>
where
    S: OutcomeSink + Send,
    F: Fn(usize, &Range<usize>) -> Result<S, Error> + Sync,
{
    let ranges = config.shards(reference.len(), max_shards);

    if ranges.len() == 1 {
        let range = ranges.into_iter().next().unwrap_or_default();
        return run_shard(reference, comparison, config, 0, range, &make_sink).map(|r| vec![r]);
    }

    tracing::info!(shards = ranges.len(), "running sharded join");

    thread::scope(|scope| {
        let handles: Vec<_> = ranges
            .into_iter()
            .enumerate()
            .map(|(index, range)| {
                let make_sink = &make_sink;
                scope.spawn(move || {
                    run_shard(reference, comparison, config, index, range, make_sink)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
}

fn run_shard<S, F>(
    reference: &Capture,
    comparison: &Capture,
    config: &JoinConfig,
    index: usize,
    range: Range<usize>,
    make_sink: &F,
) -> Result<ShardResult<S>, Error>
where
    S: OutcomeSink,
    F: Fn(usize, &Range<usize>) -> Result<S, Error>,
{
    tracing::debug!(shard = index, start = range.start, end = range.end, "shard started");

    let mut sink = make_sink(index, &range)?;
    let mut correlator = Correlator::new();
    let counters = correlator.join_range(reference, comparison, config, range.clone(), &mut sink)?;

    Ok(ShardResult {
        index,
        range,
        sink,
        counters,
        stats: *correlator.stats(),
    })
}
