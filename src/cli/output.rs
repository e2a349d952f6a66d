//! Output formatting for run statistics.
//!
//! End-of-run counters and latency figures are printed as a table, CSV or a
//! single JSON object, depending on `--stats`.

use std::io::Write;
use std::ops::Range;

use clap::ValueEnum;
use serde::Serialize;

use erfjoin_core::{LatencyStats, RunCounters};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table (default)
    Table,
    /// Comma-separated values
    Csv,
    /// JSON (one object per summary)
    Json,
}

/// Latency figures as printed, in nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencyReport {
    pub samples: u64,
    pub negative: u64,
    pub min_ns: Option<i64>,
    pub max_ns: Option<i64>,
    pub mean_ns: Option<f64>,
    pub p50_ns: Option<u64>,
    pub p90_ns: Option<u64>,
    pub p99_ns: Option<u64>,
    pub p999_ns: Option<u64>,
}

impl From<LatencyStats> for LatencyReport {
    fn from(stats: LatencyStats) -> Self {
        Self {
            samples: stats.count,
            negative: stats.negative,
            min_ns: stats.min,
            max_ns: stats.max,
            mean_ns: stats.mean,
            p50_ns: stats.p50,
            p90_ns: stats.p90,
            p99_ns: stats.p99,
            p999_ns: stats.p999,
        }
    }
}

impl LatencyReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Latency Samples", self.samples.to_string()),
            ("Negative Latencies", self.negative.to_string()),
            ("Latency Min (ns)", opt(self.min_ns)),
            ("Latency Mean (ns)", opt(self.mean_ns.map(|m| format!("{m:.1}")))),
            ("Latency p50 (ns)", opt(self.p50_ns)),
            ("Latency p90 (ns)", opt(self.p90_ns)),
            ("Latency p99 (ns)", opt(self.p99_ns)),
            ("Latency p99.9 (ns)", opt(self.p999_ns)),
            ("Latency Max (ns)", opt(self.max_ns)),
        ]
    }
}

/// Statistics of one join run.
#[derive(Debug, Clone, Serialize)]
pub struct JoinReport {
    pub start: usize,
    pub end: usize,
    pub shards: usize,
    pub matched: u64,
    pub dropped_before_match: u64,
    pub dropped_after_match: u64,
    pub pruned_out_of_time: u64,
    pub loss_ratio: Option<f64>,
    pub latency: LatencyReport,
}

impl JoinReport {
    pub fn new(range: Range<usize>, shards: usize, counters: &RunCounters, latency: LatencyStats) -> Self {
        Self {
            start: range.start,
            end: range.end,
            shards,
            matched: counters.total_matched,
            dropped_before_match: counters.total_dropped_before_match,
            dropped_after_match: counters.total_dropped_after_match,
            pruned_out_of_time: counters.total_pruned_out_of_time,
            loss_ratio: counters.loss_ratio(),
            latency: latency.into(),
        }
    }
}

/// Statistics of an existing join file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub records: u64,
    pub matched: u64,
    pub unmatched: u64,
    pub latency: LatencyReport,
}

/// A summary that can be printed as metric/value rows.
pub trait Report: Serialize {
    fn rows(&self) -> Vec<(&'static str, String)>;
}

impl Report for JoinReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Records", format!("{}-{}", self.start, self.end)),
            ("Shards", self.shards.to_string()),
            ("Matched Total", self.matched.to_string()),
            ("Dropped Before 1st Match", self.dropped_before_match.to_string()),
            ("Dropped After 1st Match", self.dropped_after_match.to_string()),
            ("Dropped Out of Time", self.pruned_out_of_time.to_string()),
            (
                "Loss Ratio",
                opt(self.loss_ratio.map(|r| format!("{:.6}", r))),
            ),
        ];
        rows.extend(self.latency.rows());
        rows
    }
}

impl Report for FileReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Records", self.records.to_string()),
            ("Matched", self.matched.to_string()),
            ("Unmatched", self.unmatched.to_string()),
        ];
        rows.extend(self.latency.rows());
        rows
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Formats run statistics for output.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create a new formatter with the specified format.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Format a report and write to the given writer.
    pub fn write<R: Report, W: Write>(&self, report: &R, writer: &mut W) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Table => self.write_table(report, writer),
            OutputFormat::Csv => self.write_csv(report, writer),
            OutputFormat::Json => self.write_json(report, writer),
        }
    }

    fn write_table<R: Report, W: Write>(&self, report: &R, writer: &mut W) -> std::io::Result<()> {
        use comfy_table::{Cell, CellAlignment, Table};

        let mut table = Table::new();
        table.set_header(vec![Cell::new("Metric"), Cell::new("Value")]);
        for (name, value) in report.rows() {
            table.add_row(vec![
                Cell::new(name),
                Cell::new(value).set_alignment(CellAlignment::Right),
            ]);
        }

        writeln!(writer, "{table}")
    }

    fn write_csv<R: Report, W: Write>(&self, report: &R, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "metric,value")?;
        for (name, value) in report.rows() {
            writeln!(writer, "{name},{value}")?;
        }
        Ok(())
    }

    fn write_json<R: Report, W: Write>(&self, report: &R, writer: &mut W) -> std::io::Result<()> {
        let json = serde_json::to_string(report).map_err(|e| std::io::Error::other(e.to_string()))?;
        writeln!(writer, "{json}")
    }
}
