//! Progress reporting for long joins.

use indicatif::{ProgressBar, ProgressStyle};

use erfjoin_core::{Error, MatchOutcome, OutcomeSink, RecordView};

/// Records between progress bar updates.
const TICK_RECORDS: u64 = 64 * 1024;

/// Build the shared join progress bar.
pub fn join_progress_bar(total: u64) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} records ({per_sec})",
        )?
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
    );
    Ok(pb)
}

/// Wraps a sink and advances a progress bar as outcomes pass through.
///
/// The bar may be shared between shards; updates are batched so the bar's
/// internal lock is taken once per [`TICK_RECORDS`] records.
pub struct ProgressSink<S> {
    inner: S,
    bar: Option<ProgressBar>,
    pending: u64,
}

impl<S> ProgressSink<S> {
    pub fn new(inner: S, bar: Option<ProgressBar>) -> Self {
        Self {
            inner,
            bar,
            pending: 0,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn flush_pending(&mut self) {
        if let Some(bar) = &self.bar {
            bar.inc(self.pending);
        }
        self.pending = 0;
    }
}

impl<S: OutcomeSink> OutcomeSink for ProgressSink<S> {
    #[inline]
    fn emit(
        &mut self,
        ref_idx: u64,
        reference: RecordView<'_>,
        outcome: &MatchOutcome,
    ) -> Result<(), Error> {
        self.inner.emit(ref_idx, reference, outcome)?;
        self.pending += 1;
        if self.pending == TICK_RECORDS {
            self.flush_pending();
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.flush_pending();
        self.inner.finish()
    }
}
