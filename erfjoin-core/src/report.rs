//! Latency summaries.
//!
//! [`LatencySummary`] streams matched latencies into an HdrHistogram so
//! percentiles stay cheap on captures with hundreds of millions of packets.
//! The histogram only holds non-negative values; latencies below zero (the
//! comparison tap stamped the packet first) are counted on the side and
//! still contribute to the exact min, max and mean.

use hdrhistogram::Histogram;

use crate::erf::RecordView;
use crate::error::Error;
use crate::join::{MatchOutcome, OutcomeSink};
use crate::output::JoinRecord;

/// Significant figures kept by the histogram.
const SIGFIGS: u8 = 3;

/// Accumulated latency distribution of one or more runs.
#[derive(Clone, Debug)]
pub struct LatencySummary {
    histogram: Histogram<u64>,
    count: u64,
    negative: u64,
    sum: i128,
    min: Option<i64>,
    max: Option<i64>,
}

/// Point-in-time figures from a [`LatencySummary`], in nanoseconds.
///
/// Percentiles cover the non-negative latencies only.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub negative: u64,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub mean: Option<f64>,
    pub p50: Option<u64>,
    pub p90: Option<u64>,
    pub p99: Option<u64>,
    pub p999: Option<u64>,
}

impl Default for LatencySummary {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencySummary {
    pub fn new() -> Self {
        // Auto-resizing, so any latency can be recorded without a preset max
        let histogram = Histogram::<u64>::new(SIGFIGS).expect("valid sigfigs");
        Self {
            histogram,
            count: 0,
            negative: 0,
            sum: 0,
            min: None,
            max: None,
        }
    }

    /// Add one latency sample.
    pub fn record(&mut self, latency_ns: i64) {
        self.count += 1;
        self.sum += i128::from(latency_ns);
        self.min = Some(self.min.map_or(latency_ns, |m| m.min(latency_ns)));
        self.max = Some(self.max.map_or(latency_ns, |m| m.max(latency_ns)));

        if latency_ns < 0 {
            self.negative += 1;
        } else {
            self.histogram.saturating_record(latency_ns as u64);
        }
    }

    /// Add the matched latency of a decoded join record, if any.
    pub fn record_join(&mut self, record: &JoinRecord) {
        if let Some(latency) = record.latency() {
            self.record(latency);
        }
    }

    /// Fold another summary into this one.
    pub fn merge(&mut self, other: &LatencySummary) {
        if let Err(e) = self.histogram.add(&other.histogram) {
            tracing::warn!(error = %e, "failed to merge latency histograms");
        }
        self.count += other.count;
        self.negative += other.negative;
        self.sum += other.sum;
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    /// Number of samples, negative ones included.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of samples below zero.
    pub fn negative(&self) -> u64 {
        self.negative
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn min(&self) -> Option<i64> {
        self.min
    }

    pub fn max(&self) -> Option<i64> {
        self.max
    }

    /// Exact arithmetic mean over all samples.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }

    /// Latency at quantile `q` (0.0-1.0) of the non-negative samples.
    pub fn quantile(&self, q: f64) -> Option<u64> {
        (self.histogram.len() > 0).then(|| self.histogram.value_at_quantile(q))
    }

    pub fn stats(&self) -> LatencyStats {
        LatencyStats {
            count: self.count,
            negative: self.negative,
            min: self.min,
            max: self.max,
            mean: self.mean(),
            p50: self.quantile(0.50),
            p90: self.quantile(0.90),
            p99: self.quantile(0.99),
            p999: self.quantile(0.999),
        }
    }
}

impl OutcomeSink for LatencySummary {
    #[inline]
    fn emit(&mut self, _: u64, _: RecordView<'_>, outcome: &MatchOutcome) -> Result<(), Error> {
        if let Some(latency) = outcome.latency_ns() {
            self.record(latency);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erf::ErfRecordBuilder;

    #[test]
    fn test_empty() {
        let summary = LatencySummary::new();
        let stats = summary.stats();
        assert!(summary.is_empty());
        assert_eq!(stats.count, 0);
        assert_eq!(stats.min, None);
        assert_eq!(stats.mean, None);
        assert_eq!(stats.p50, None);
    }

    #[test]
    fn test_percentiles() {
        let mut summary = LatencySummary::new();
        for v in 1..=1000 {
            summary.record(v);
        }
        let stats = summary.stats();
        assert_eq!(stats.count, 1000);
        assert_eq!(stats.min, Some(1));
        assert_eq!(stats.max, Some(1000));
        assert_eq!(stats.mean, Some(500.5));
        // Exact below 2048 at three significant figures
        assert!(matches!(stats.p50, Some(499..=501)));
        assert!(matches!(stats.p90, Some(899..=901)));
        assert!(matches!(stats.p99, Some(989..=991)));
        assert_eq!(summary.quantile(1.0), Some(1000));
    }

    #[test]
    fn test_negative_latencies() {
        let mut summary = LatencySummary::new();
        summary.record(-100);
        summary.record(300);
        let stats = summary.stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.negative, 1);
        assert_eq!(stats.min, Some(-100));
        assert_eq!(stats.max, Some(300));
        assert_eq!(stats.mean, Some(100.0));
        assert_eq!(stats.p50, Some(300));
    }

    #[test]
    fn test_merge() {
        let mut a = LatencySummary::new();
        let mut b = LatencySummary::new();
        a.record(10);
        b.record(-5);
        b.record(20);
        a.merge(&b);
        assert_eq!(a.count(), 3);
        assert_eq!(a.negative(), 1);
        assert_eq!(a.min(), Some(-5));
        assert_eq!(a.max(), Some(20));
        assert_eq!(a.quantile(1.0), Some(20));
    }

    #[test]
    fn test_sink_ignores_unmatched() {
        let bytes = ErfRecordBuilder::new().build();
        let view = RecordView::new(&bytes);
        let mut summary = LatencySummary::new();
        summary
            .emit(
                0,
                view,
                &MatchOutcome::Matched {
                    ref_idx: 0,
                    cmp_idx: 0,
                    latency_ns: 42,
                },
            )
            .unwrap();
        summary
            .emit(1, view, &MatchOutcome::DroppedAfterFirstMatch)
            .unwrap();
        assert_eq!(summary.count(), 1);
        assert_eq!(summary.max(), Some(42));
    }
}
