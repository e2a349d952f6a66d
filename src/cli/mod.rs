//! Command-line interface module.
//!
//! This module handles:
//! - Argument parsing via clap
//! - Running joins, summarizing join files and dumping them as rows
//! - Statistics formatting (table, CSV, JSON)
//! - Row exports (CSV, JSON Lines) and progress reporting

mod args;
mod commands;
mod export;
mod output;
mod progress;

pub use args::{Args, EmitMode, PacketType, RecordFormat};
pub use commands::{dump_file, run_join, summarize_file};
pub use export::{ExportRow, JoinRow, OutcomeRow, RowExporter, RowFormat};
pub use output::{FileReport, JoinReport, LatencyReport, OutputFormat, OutputFormatter, Report};
pub use progress::{join_progress_bar, ProgressSink};
