//! The CLI commands: run a join, summarize a join file, dump a join file.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use erfjoin_core::{
    join_sharded, CaptureSource, EmitPolicy, Error, JoinRecordReader,
    JoinRecordWriter, LatencySummary, OutcomeSink, RunCounters,
};

use super::args::{Args, PacketType, RecordFormat};
use super::export::{JoinRow, RowExporter, RowFormat};
use super::output::{FileReport, JoinReport, OutputFormatter};
use super::progress::{join_progress_bar, ProgressSink};

type OutputSink = Box<dyn OutcomeSink + Send>;

/// Run the join described by `args`, write the join file and print the
/// run statistics to `stdout`.
pub fn run_join<W: Write>(args: &Args, stdout: &mut W) -> Result<JoinReport> {
    let dag0 = args
        .dag0
        .as_ref()
        .context("Reference capture required (-i/--dag0). Use --help for usage.")?;
    let dag1 = args
        .dag1
        .as_ref()
        .context("Comparison capture required (-I/--dag1). Use --help for usage.")?;

    let reference = CaptureSource::open(dag0)
        .with_context(|| format!("Failed to open reference capture: {}", dag0.display()))?;
    let comparison = CaptureSource::open(dag1)
        .with_context(|| format!("Failed to open comparison capture: {}", dag1.display()))?;

    let config = args.join_config();
    let selected = config.clamp(reference.capture().len());
    let shard_count = config
        .shards(reference.capture().len(), args.worker_count())
        .len();

    let format = args.record_format();
    let policy = EmitPolicy::from(args.emit);
    let bar = if args.progress {
        Some(join_progress_bar(selected.len() as u64)?)
    } else {
        None
    };

    let paths: Vec<PathBuf> = if shard_count == 1 {
        vec![args.output.clone()]
    } else {
        (0..shard_count).map(|i| part_path(&args.output, i)).collect()
    };

    tracing::info!(
        output = %args.output.display(),
        ?format,
        ?policy,
        shards = shard_count,
        window_ns = config.window_ns,
        guard_ns = config.guard_ns,
        "starting join"
    );

    let shards = join_sharded(
        reference.capture(),
        comparison.capture(),
        &config,
        shard_count,
        |index, _| {
            let file = File::create(&paths[index])?;
            let output: OutputSink = match format {
                RecordFormat::Binary => Box::new(JoinRecordWriter::new(file, policy)),
                RecordFormat::Csv => {
                    Box::new(RowExporter::new(file, RowFormat::Csv, policy, index == 0))
                }
                RecordFormat::Json => {
                    Box::new(RowExporter::new(file, RowFormat::Json, policy, index == 0))
                }
            };
            Ok::<_, Error>((ProgressSink::new(output, bar.clone()), LatencySummary::new()))
        },
    )
    .with_context(|| format!("Join failed writing {}", args.output.display()));
    let shards = match shards {
        Ok(shards) => shards,
        Err(e) => {
            if shard_count > 1 {
                remove_parts(&paths);
            }
            return Err(e);
        }
    };

    let mut counters = RunCounters::default();
    let mut latency = LatencySummary::new();
    for shard in shards {
        counters += shard.counters;
        latency.merge(&shard.sink.1);
    }

    if shard_count > 1 {
        if let Err(e) = concatenate_parts(&args.output, &paths) {
            remove_parts(&paths);
            return Err(e);
        }
    }

    if let Some(pb) = bar {
        pb.finish_with_message(format!("{} records joined", counters.total()));
    }

    let report = JoinReport::new(selected, shard_count, &counters, latency.stats());
    OutputFormatter::new(args.stats).write(&report, stdout)?;
    eprintln!("Wrote join output to {}", args.output.display());

    Ok(report)
}

/// Read a binary join file and print its statistics to `stdout`.
pub fn summarize_file<W: Write>(
    path: &Path,
    formatter: &OutputFormatter,
    stdout: &mut W,
) -> Result<FileReport> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read join file: {}", path.display()))?;

    let mut latency = LatencySummary::new();
    let mut records = 0u64;
    let mut matched = 0u64;
    for record in JoinRecordReader::new(&bytes) {
        let record =
            record.with_context(|| format!("Invalid join file: {}", path.display()))?;
        records += 1;
        if record.matched {
            matched += 1;
        }
        latency.record_join(&record);
    }

    let report = FileReport {
        records,
        matched,
        unmatched: records - matched,
        latency: latency.stats().into(),
    };
    formatter.write(&report, stdout)?;
    Ok(report)
}

/// Write every record of a binary join file to `stdout` as text rows,
/// keeping only `packet_type` packets when given. Returns the rows written.
pub fn dump_file<W: Write>(
    path: &Path,
    format: RowFormat,
    packet_type: Option<PacketType>,
    stdout: W,
) -> Result<u64> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read join file: {}", path.display()))?;

    let mut exporter = RowExporter::for_join_rows(stdout, format);
    let mut times: Option<(u64, u64)> = None;
    for record in JoinRecordReader::new(&bytes) {
        let record =
            record.with_context(|| format!("Invalid join file: {}", path.display()))?;
        if let Some(packet_type) = packet_type {
            if record.reference().ip_protocol() != Some(packet_type.protocol()) {
                continue;
            }
        }

        let now = record.reference().timestamp_ns();
        let (start, last) = times.unwrap_or((now, now));
        exporter.write_row(&JoinRow::new(&record, start, last))?;
        times = Some((start, now));
    }
    exporter.finish()?;

    let rows = exporter.rows();
    tracing::debug!(path = %path.display(), rows, "dumped join file");
    exporter.into_inner()?;
    Ok(rows)
}

/// Path of shard `index`'s part file next to `output`.
fn part_path(output: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(format!(".part{index}"));
    PathBuf::from(name)
}

/// Append the shard parts to `output` in order, removing them as we go.
fn concatenate_parts(output: &Path, parts: &[PathBuf]) -> Result<()> {
    let file = File::create(output)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;
    let mut out = BufWriter::new(file);

    for part in parts {
        let mut input = File::open(part)
            .with_context(|| format!("Failed to open shard output: {}", part.display()))?;
        io::copy(&mut input, &mut out)?;
        fs::remove_file(part)?;
    }

    out.flush()?;
    Ok(())
}

/// Remove whatever shard part files a failed run left behind.
fn remove_parts(parts: &[PathBuf]) {
    for part in parts {
        match fs::remove_file(part) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %part.display(), error = %e, "failed to remove shard output")
            }
        }
    }
}
