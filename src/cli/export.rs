//! Row exports (CSV and JSON Lines).
//!
//! Live joins export one [`OutcomeRow`] per outcome; `--dump` exports one
//! [`JoinRow`] per record of an existing binary join file.

use std::io::{BufWriter, Write};

use serde::Serialize;

use erfjoin_core::{EmitPolicy, Error, JoinRecord, MatchOutcome, OutcomeSink, RecordView};

/// Text export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormat {
    Csv,
    Json,
}

/// A row type the exporter can write.
pub trait ExportRow: Serialize {
    /// CSV header line, without the newline.
    const CSV_HEADER: &'static str;

    fn write_csv<W: Write>(&self, writer: &mut W) -> std::io::Result<()>;
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

/// One exported row.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeRow {
    pub ref_idx: u64,
    pub timestamp_ns: u64,
    pub wlen: u16,
    pub outcome: &'static str,
    pub cmp_idx: Option<u64>,
    pub latency_ns: Option<i64>,
}

impl OutcomeRow {
    pub fn new(ref_idx: u64, reference: RecordView<'_>, outcome: &MatchOutcome) -> Self {
        Self {
            ref_idx,
            timestamp_ns: reference.timestamp_ns(),
            wlen: reference.wlen(),
            outcome: outcome.label(),
            cmp_idx: outcome.cmp_idx(),
            latency_ns: outcome.latency_ns(),
        }
    }
}

impl ExportRow for OutcomeRow {
    const CSV_HEADER: &'static str = "ref_idx,timestamp_ns,wlen,outcome,cmp_idx,latency_ns";

    fn write_csv<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            self.ref_idx,
            self.timestamp_ns,
            self.wlen,
            self.outcome,
            opt(self.cmp_idx),
            opt(self.latency_ns),
        )
    }
}

/// One record of a binary join file, with inter-arrival times.
#[derive(Debug, Clone, Serialize)]
pub struct JoinRow {
    pub timestamp_ns: u64,
    pub since_start_ns: u64,
    pub since_last_ns: u64,
    pub lost: u16,
    pub record_type: u8,
    pub wlen: u16,
    pub matched: bool,
    pub ref_idx: u64,
    pub cmp_idx: Option<u64>,
    pub latency_ns: Option<i64>,
}

impl JoinRow {
    /// `start_ns` is the first dumped timestamp, `last_ns` the previous one.
    pub fn new(record: &JoinRecord, start_ns: u64, last_ns: u64) -> Self {
        let reference = record.reference();
        let timestamp_ns = reference.timestamp_ns();
        Self {
            timestamp_ns,
            since_start_ns: timestamp_ns.saturating_sub(start_ns),
            since_last_ns: timestamp_ns.saturating_sub(last_ns),
            lost: reference.lctr(),
            record_type: reference.record_type(),
            wlen: reference.wlen(),
            matched: record.matched,
            ref_idx: record.ref_idx,
            cmp_idx: record.matched.then_some(record.cmp_idx),
            latency_ns: record.latency(),
        }
    }
}

impl ExportRow for JoinRow {
    const CSV_HEADER: &'static str =
        "timestamp_ns,since_start_ns,since_last_ns,lost,type,wlen,matched,ref_idx,cmp_idx,latency_ns";

    fn write_csv<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{}",
            self.timestamp_ns,
            self.since_start_ns,
            self.since_last_ns,
            self.lost,
            self.record_type,
            self.wlen,
            u8::from(self.matched),
            self.ref_idx,
            opt(self.cmp_idx),
            opt(self.latency_ns),
        )
    }
}

/// Writes text rows; as an [`OutcomeSink`], one [`OutcomeRow`] per admitted
/// outcome.
pub struct RowExporter<W: Write> {
    writer: BufWriter<W>,
    format: RowFormat,
    policy: EmitPolicy,
    header: &'static str,
    header_pending: bool,
    rows: u64,
}

impl<W: Write> RowExporter<W> {
    /// `header` controls whether a CSV header line is written first; shards
    /// after the first leave it out so their parts concatenate cleanly.
    pub fn new(writer: W, format: RowFormat, policy: EmitPolicy, header: bool) -> Self {
        Self {
            writer: BufWriter::new(writer),
            format,
            policy,
            header: OutcomeRow::CSV_HEADER,
            header_pending: header && format == RowFormat::Csv,
            rows: 0,
        }
    }

    /// Exporter for [`JoinRow`]s, with a CSV header.
    pub fn for_join_rows(writer: W, format: RowFormat) -> Self {
        Self {
            header: JoinRow::CSV_HEADER,
            ..Self::new(writer, format, EmitPolicy::All, true)
        }
    }

    /// Write one row.
    pub fn write_row<R: ExportRow>(&mut self, row: &R) -> Result<(), Error> {
        self.write_header()?;
        match self.format {
            RowFormat::Csv => row.write_csv(&mut self.writer)?,
            RowFormat::Json => {
                serde_json::to_writer(&mut self.writer, row)
                    .map_err(|e| std::io::Error::other(e.to_string()))?;
                self.writer.write_all(b"\n")?;
            }
        }
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W, Error> {
        self.writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))
    }

    fn write_header(&mut self) -> std::io::Result<()> {
        if self.header_pending {
            writeln!(self.writer, "{}", self.header)?;
            self.header_pending = false;
        }
        Ok(())
    }
}

impl<W: Write> OutcomeSink for RowExporter<W> {
    fn emit(
        &mut self,
        ref_idx: u64,
        reference: RecordView<'_>,
        outcome: &MatchOutcome,
    ) -> Result<(), Error> {
        if !self.policy.admits(outcome) {
            return Ok(());
        }
        self.write_row(&OutcomeRow::new(ref_idx, reference, outcome))
    }

    fn finish(&mut self) -> Result<(), Error> {
        // An empty CSV export still gets its header.
        self.write_header()?;
        self.writer.flush()?;
        Ok(())
    }
}
