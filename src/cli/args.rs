//! Command-line argument definitions.

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use erfjoin_core::{EmitPolicy, JoinConfig, DEFAULT_GUARD_NS, DEFAULT_WINDOW_US};

use super::{OutputFormat, RowFormat};

/// Join output file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordFormat {
    /// 112-byte ERF join records
    Binary,
    /// Comma-separated values, one row per record
    Csv,
    /// JSON Lines (one JSON object per record)
    Json,
}

/// IP packet types accepted by `--packet-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PacketType {
    Tcp,
    Udp,
    Icmp,
}

impl PacketType {
    /// IPv4 protocol number.
    pub fn protocol(self) -> u8 {
        match self {
            PacketType::Tcp => 6,
            PacketType::Udp => 17,
            PacketType::Icmp => 1,
        }
    }
}

impl RecordFormat {
    /// Infer the record format from a file extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| match ext.as_str() {
                "csv" => Some(RecordFormat::Csv),
                "json" | "jsonl" | "ndjson" => Some(RecordFormat::Json),
                "erf" | "out" | "bin" => Some(RecordFormat::Binary),
                _ => None,
            })
    }
}

/// Which records are written to the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmitMode {
    /// Every processed reference record
    All,
    /// Matched and lost packets only
    Losses,
}

impl From<EmitMode> for EmitPolicy {
    fn from(mode: EmitMode) -> Self {
        match mode {
            EmitMode::All => EmitPolicy::All,
            EmitMode::Losses => EmitPolicy::Losses,
        }
    }
}

/// Match packets across two ERF captures and report latency and loss.
#[derive(Parser, Debug)]
#[command(name = "erfjoin")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Reference capture (the earlier tap)
    #[arg(short = 'i', long = "dag0", value_name = "FILE")]
    pub dag0: Option<PathBuf>,

    /// Comparison capture (the later tap)
    #[arg(short = 'I', long = "dag1", value_name = "FILE")]
    pub dag1: Option<PathBuf>,

    /// Join output file
    #[arg(short = 'o', long = "output", value_name = "FILE", default_value = "erf-join.out")]
    pub output: PathBuf,

    /// First reference record to process
    #[arg(short = 'f', long = "offset", default_value_t = 0)]
    pub offset: u64,

    /// Number of reference records to process (-1 for all)
    #[arg(short = 'l', long = "length", default_value_t = -1, allow_negative_numbers = true)]
    pub length: i64,

    /// Search window in microseconds
    #[arg(short = 'w', long = "window", default_value_t = DEFAULT_WINDOW_US)]
    pub window: u64,

    /// How far before the reference timestamp to search, in nanoseconds
    #[arg(short = 'g', long = "guard", value_name = "NS", default_value_t = DEFAULT_GUARD_NS)]
    pub guard: u64,

    /// Join output format (inferred from extension if not specified)
    #[arg(long = "format", value_enum, value_name = "FORMAT")]
    pub format: Option<RecordFormat>,

    /// Which records to write
    #[arg(long = "emit", value_enum, default_value = "all")]
    pub emit: EmitMode,

    /// Worker threads; 0 uses every available core
    ///
    /// Each worker joins a contiguous slice of the reference capture and
    /// counts matches on its own, so a packet lost before a slice's second
    /// match is reported as dropped before the first match (and left out
    /// by `--emit losses`). Use `-j 1` for exact loss classification.
    #[arg(short = 'j', long = "jobs", default_value_t = 1)]
    pub jobs: usize,

    /// Show a progress bar
    #[arg(long = "progress")]
    pub progress: bool,

    /// Format of the end-of-run statistics
    #[arg(long = "stats", value_enum, default_value = "table")]
    pub stats: OutputFormat,

    /// Summarize an existing binary join file and exit
    #[arg(long = "summarize", value_name = "JOIN_FILE")]
    pub summarize: Option<PathBuf>,

    /// Print every record of an existing binary join file as CSV (or JSON
    /// Lines with `--format json`) and exit
    #[arg(long = "dump", value_name = "JOIN_FILE", conflicts_with = "summarize")]
    pub dump: Option<PathBuf>,

    /// Only dump records carrying this IP packet type
    #[arg(short = 'p', long = "packet-type", value_enum, requires = "dump")]
    pub packet_type: Option<PacketType>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Output format, falling back to the file extension, then binary.
    pub fn record_format(&self) -> RecordFormat {
        self.format
            .or_else(|| RecordFormat::from_extension(&self.output))
            .unwrap_or(RecordFormat::Binary)
    }

    /// Row format of `--dump`.
    pub fn dump_format(&self) -> RowFormat {
        match self.format {
            Some(RecordFormat::Json) => RowFormat::Json,
            _ => RowFormat::Csv,
        }
    }

    /// Join parameters selected by the window, guard and range options.
    pub fn join_config(&self) -> JoinConfig {
        JoinConfig::from_window_us(self.window)
            .with_guard_ns(self.guard)
            .with_range(self.offset, self.length)
    }

    /// Worker count with `0` resolved to the machine's parallelism.
    pub fn worker_count(&self) -> usize {
        match self.jobs {
            0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        }
    }
}
