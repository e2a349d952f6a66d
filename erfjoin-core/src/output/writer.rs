//! Writing join records.

use std::io::{BufWriter, Write};

use crate::erf::RecordView;
use crate::error::Error;
use crate::join::{MatchOutcome, OutcomeSink};

use super::JoinRecord;

/// Which outcomes become output records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmitPolicy {
    /// One record per processed reference record
    #[default]
    All,
    /// Matches and losses only; skew and pruned records are left out
    Losses,
}

impl EmitPolicy {
    /// Whether `outcome` is written under this policy.
    pub fn admits(&self, outcome: &MatchOutcome) -> bool {
        match self {
            EmitPolicy::All => true,
            EmitPolicy::Losses => matches!(
                outcome,
                MatchOutcome::Matched { .. } | MatchOutcome::DroppedAfterFirstMatch
            ),
        }
    }
}

/// [`OutcomeSink`] that serializes outcomes as 112-byte join records.
pub struct JoinRecordWriter<W: Write> {
    inner: BufWriter<W>,
    policy: EmitPolicy,
    written: u64,
}

impl<W: Write> JoinRecordWriter<W> {
    /// Wrap `inner`; output is buffered until `finish`.
    pub fn new(inner: W, policy: EmitPolicy) -> Self {
        Self {
            inner: BufWriter::with_capacity(64 * 1024, inner),
            policy,
            written: 0,
        }
    }

    /// Records written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn policy(&self) -> EmitPolicy {
        self.policy
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W, Error> {
        self.inner
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))
    }
}

impl<W: Write> OutcomeSink for JoinRecordWriter<W> {
    fn emit(
        &mut self,
        ref_idx: u64,
        reference: RecordView<'_>,
        outcome: &MatchOutcome,
    ) -> Result<(), Error> {
        if !self.policy.admits(outcome) {
            return Ok(());
        }
        let record = JoinRecord::from_outcome(ref_idx, reference, outcome);
        self.inner.write_all(&record.encode())?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.inner.flush()?;
        tracing::debug!(records = self.written, "join output flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erf::ErfRecordBuilder;
    use crate::output::{JoinRecordReader, JOIN_RECORD_LEN};

    fn outcomes() -> Vec<MatchOutcome> {
        vec![
            MatchOutcome::DroppedBeforeFirstMatch,
            MatchOutcome::Matched {
                ref_idx: 1,
                cmp_idx: 0,
                latency_ns: 40,
            },
            MatchOutcome::DroppedAfterFirstMatch,
            MatchOutcome::PrunedOutOfTime,
        ]
    }

    fn write_all(policy: EmitPolicy) -> (Vec<u8>, u64) {
        let bytes = ErfRecordBuilder::new().raw_nanos(5).build();
        let mut writer = JoinRecordWriter::new(Vec::new(), policy);
        for (i, outcome) in outcomes().iter().enumerate() {
            writer
                .emit(i as u64, RecordView::new(&bytes), outcome)
                .unwrap();
        }
        writer.finish().unwrap();
        let written = writer.written();
        (writer.into_inner().unwrap(), written)
    }

    #[test]
    fn test_emit_all() {
        let (buf, written) = write_all(EmitPolicy::All);
        assert_eq!(written, 4);
        assert_eq!(buf.len(), 4 * JOIN_RECORD_LEN);

        let matched: Vec<bool> = JoinRecordReader::new(&buf)
            .map(|r| r.unwrap().matched)
            .collect();
        assert_eq!(matched, vec![false, true, false, false]);
    }

    #[test]
    fn test_emit_losses_only() {
        let (buf, written) = write_all(EmitPolicy::Losses);
        assert_eq!(written, 2);

        let ref_idx: Vec<u64> = JoinRecordReader::new(&buf)
            .map(|r| r.unwrap().ref_idx)
            .collect();
        assert_eq!(ref_idx, vec![1, 2]);
    }

    #[test]
    fn test_policy_admits() {
        assert!(EmitPolicy::All.admits(&MatchOutcome::PrunedOutOfTime));
        assert!(!EmitPolicy::Losses.admits(&MatchOutcome::PrunedOutOfTime));
        assert!(!EmitPolicy::Losses.admits(&MatchOutcome::DroppedBeforeFirstMatch));
        assert!(EmitPolicy::Losses.admits(&MatchOutcome::DroppedAfterFirstMatch));
    }
}
