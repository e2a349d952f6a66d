//! Binary join output.
//!
//! A join file is a flat array of 112-byte records, one per reported
//! reference packet:
//!
//! ```text
//!  0                       80         88         96         104        112
//!  +-----------------------+----------+----------+----------+----------+
//!  | reference ERF record  | matched  | ref_idx  | cmp_idx  | latency  |
//!  | (rlen rewritten: 112) | u64 LE   | u64 LE   | u64 LE   | i64 LE   |
//!  +-----------------------+----------+----------+----------+----------+
//! ```
//!
//! Rewriting `rlen` keeps the file a valid ERF stream: ERF readers skip the
//! trailing fields, and analysis tools recognise join records by their
//! length. Unmatched records carry [`NO_MATCH`] and [`NO_LATENCY`].

mod reader;
mod writer;

pub use reader::JoinRecordReader;
pub use writer::{EmitPolicy, JoinRecordWriter};

use crate::erf::{RecordView, RECORD_LEN, RLEN_OFFSET};
use crate::error::JoinRecordError;
use crate::join::MatchOutcome;

/// Size of one join output record.
pub const JOIN_RECORD_LEN: usize = RECORD_LEN + 4 * 8;

/// `cmp_idx` of an unmatched record.
pub const NO_MATCH: u64 = u64::MAX;

/// `latency_ns` of an unmatched record.
pub const NO_LATENCY: i64 = -1;

const MATCHED_OFFSET: usize = RECORD_LEN;
const REF_IDX_OFFSET: usize = RECORD_LEN + 8;
const CMP_IDX_OFFSET: usize = RECORD_LEN + 16;
const LATENCY_OFFSET: usize = RECORD_LEN + 24;

/// One decoded join output record.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct JoinRecord {
    /// Reference record as written (with `rlen` rewritten)
    pub reference: [u8; RECORD_LEN],
    /// Whether a match was found
    pub matched: bool,
    /// Index of the record in the reference capture
    pub ref_idx: u64,
    /// Index of the match in the comparison capture, or [`NO_MATCH`]
    pub cmp_idx: u64,
    /// Comparison minus reference timestamp, or [`NO_LATENCY`]
    pub latency_ns: i64,
}

impl JoinRecord {
    /// Build the output record for one outcome.
    pub fn from_outcome(ref_idx: u64, reference: RecordView<'_>, outcome: &MatchOutcome) -> Self {
        let mut echo = *reference.as_bytes();
        echo[RLEN_OFFSET..RLEN_OFFSET + 2]
            .copy_from_slice(&(JOIN_RECORD_LEN as u16).to_be_bytes());

        match outcome {
            MatchOutcome::Matched {
                cmp_idx,
                latency_ns,
                ..
            } => Self {
                reference: echo,
                matched: true,
                ref_idx,
                cmp_idx: *cmp_idx,
                latency_ns: *latency_ns,
            },
            _ => Self {
                reference: echo,
                matched: false,
                ref_idx,
                cmp_idx: NO_MATCH,
                latency_ns: NO_LATENCY,
            },
        }
    }

    /// View of the echoed reference record.
    pub fn reference(&self) -> RecordView<'_> {
        RecordView::new(&self.reference)
    }

    /// Latency if matched.
    pub fn latency(&self) -> Option<i64> {
        self.matched.then_some(self.latency_ns)
    }

    /// Serialize to the on-disk layout.
    pub fn encode(&self) -> [u8; JOIN_RECORD_LEN] {
        let mut out = [0u8; JOIN_RECORD_LEN];
        out[..RECORD_LEN].copy_from_slice(&self.reference);
        out[MATCHED_OFFSET..MATCHED_OFFSET + 8].copy_from_slice(&(self.matched as u64).to_le_bytes());
        out[REF_IDX_OFFSET..REF_IDX_OFFSET + 8].copy_from_slice(&self.ref_idx.to_le_bytes());
        out[CMP_IDX_OFFSET..CMP_IDX_OFFSET + 8].copy_from_slice(&self.cmp_idx.to_le_bytes());
        out[LATENCY_OFFSET..LATENCY_OFFSET + 8].copy_from_slice(&self.latency_ns.to_le_bytes());
        out
    }

    /// Parse the record at position `index` from `bytes`.
    ///
    /// `index` is only used in error messages.
    pub fn decode(index: u64, bytes: &[u8]) -> Result<Self, JoinRecordError> {
        if bytes.len() < JOIN_RECORD_LEN {
            return Err(JoinRecordError::Truncated {
                index,
                needed: JOIN_RECORD_LEN,
                have: bytes.len(),
            });
        }

        let mut reference = [0u8; RECORD_LEN];
        reference.copy_from_slice(&bytes[..RECORD_LEN]);
        let rlen = RecordView::new(&reference).rlen();
        if rlen as usize != JOIN_RECORD_LEN {
            return Err(JoinRecordError::UnexpectedLength {
                index,
                rlen,
                expected: JOIN_RECORD_LEN as u16,
            });
        }

        Ok(Self {
            reference,
            matched: le_u64(bytes, MATCHED_OFFSET) != 0,
            ref_idx: le_u64(bytes, REF_IDX_OFFSET),
            cmp_idx: le_u64(bytes, CMP_IDX_OFFSET),
            latency_ns: le_u64(bytes, LATENCY_OFFSET) as i64,
        })
    }
}

impl std::fmt::Debug for JoinRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinRecord")
            .field("reference", &self.reference())
            .field("matched", &self.matched)
            .field("ref_idx", &self.ref_idx)
            .field("cmp_idx", &self.cmp_idx)
            .field("latency_ns", &self.latency_ns)
            .finish()
    }
}

#[inline]
fn le_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erf::ErfRecordBuilder;

    #[test]
    fn test_layout_size() {
        assert_eq!(JOIN_RECORD_LEN, 112);
    }

    #[test]
    fn test_matched_record_fields() {
        let bytes = ErfRecordBuilder::new().raw_nanos(1_000).frame(b"abc").build();
        let outcome = MatchOutcome::Matched {
            ref_idx: 7,
            cmp_idx: 9,
            latency_ns: 55,
        };
        let record = JoinRecord::from_outcome(7, RecordView::new(&bytes), &outcome);
        let encoded = record.encode();

        assert_eq!(&encoded[10..12], &[0x00, 112]);
        assert_eq!(&encoded[RECORD_LEN..RECORD_LEN + 8], &1u64.to_le_bytes());
        assert_eq!(&encoded[REF_IDX_OFFSET..REF_IDX_OFFSET + 8], &7u64.to_le_bytes());
        assert_eq!(&encoded[CMP_IDX_OFFSET..CMP_IDX_OFFSET + 8], &9u64.to_le_bytes());
        assert_eq!(&encoded[LATENCY_OFFSET..], &55i64.to_le_bytes());
        // Everything but rlen is echoed untouched.
        assert_eq!(&encoded[..10], &bytes[..10]);
        assert_eq!(&encoded[12..RECORD_LEN], &bytes[12..]);

        let decoded = JoinRecord::decode(0, &encoded).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.reference().timestamp_ns(), 1_000);
        assert_eq!(decoded.latency(), Some(55));
    }

    #[test]
    fn test_unmatched_sentinels() {
        let bytes = ErfRecordBuilder::new().build();
        let record = JoinRecord::from_outcome(
            3,
            RecordView::new(&bytes),
            &MatchOutcome::DroppedAfterFirstMatch,
        );
        let encoded = record.encode();
        assert_eq!(&encoded[CMP_IDX_OFFSET..CMP_IDX_OFFSET + 8], &[0xff; 8]);
        assert_eq!(&encoded[LATENCY_OFFSET..], &[0xff; 8]);
        assert_eq!(record.latency(), None);
        assert!(!record.matched);
    }

    #[test]
    fn test_decode_truncated() {
        let err = JoinRecord::decode(4, &[0u8; 100]).unwrap_err();
        assert!(matches!(
            err,
            JoinRecordError::Truncated {
                index: 4,
                have: 100,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_rejects_plain_erf() {
        let mut bytes = ErfRecordBuilder::new().build().to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        let err = JoinRecord::decode(0, &bytes).unwrap_err();
        assert!(matches!(
            err,
            JoinRecordError::UnexpectedLength { rlen: 80, .. }
        ));
    }
}
