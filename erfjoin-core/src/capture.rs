//! Strided, read-only view over a capture buffer.
//!
//! A [`Capture`] owns (or maps) the raw bytes of one capture and hands out
//! [`RecordView`]s by record index. Geometry is validated once, when the
//! capture is built, so indexing never has to deal with partial records.
//!
//! Captures are cheap to clone: the bytes live behind an `Arc`, which lets
//! worker threads share the comparison capture while each one walks its own
//! slice of the reference capture.

use std::ops::Range;
use std::sync::Arc;

#[cfg(feature = "mmap")]
use memmap2::Mmap;

use crate::erf::{timestamp, RecordView, RECORD_LEN};
use crate::error::CaptureError;

/// Storage behind a capture.
#[derive(Clone)]
enum Backing {
    Owned(Arc<[u8]>),
    #[cfg(feature = "mmap")]
    Mapped(Arc<Mmap>),
}

impl Backing {
    #[inline]
    fn as_slice(&self) -> &[u8] {
        match self {
            Backing::Owned(bytes) => bytes,
            #[cfg(feature = "mmap")]
            Backing::Mapped(mmap) => mmap,
        }
    }
}

/// A validated, non-empty array of fixed-stride capture records.
#[derive(Clone)]
pub struct Capture {
    backing: Backing,
    len: usize,
}

impl Capture {
    /// Build a capture from an owned buffer.
    ///
    /// `name` only appears in error messages.
    pub fn from_vec(name: &str, bytes: Vec<u8>) -> Result<Self, CaptureError> {
        Self::validated(name, Backing::Owned(bytes.into()))
    }

    /// Build a capture over a memory map.
    #[cfg(feature = "mmap")]
    pub fn from_mmap(name: &str, mmap: Arc<Mmap>) -> Result<Self, CaptureError> {
        Self::validated(name, Backing::Mapped(mmap))
    }

    /// Build a capture from already-encoded records.
    pub fn from_records(name: &str, records: &[[u8; RECORD_LEN]]) -> Result<Self, CaptureError> {
        Self::from_vec(name, records.concat())
    }

    fn validated(name: &str, backing: Backing) -> Result<Self, CaptureError> {
        let bytes = backing.as_slice();
        if bytes.is_empty() {
            return Err(CaptureError::Empty {
                name: name.to_string(),
            });
        }
        let trailing = bytes.len() % RECORD_LEN;
        if trailing != 0 {
            return Err(CaptureError::PartialRecord {
                name: name.to_string(),
                len: bytes.len(),
                stride: RECORD_LEN,
                trailing,
            });
        }
        let len = bytes.len() / RECORD_LEN;
        Ok(Self { backing, len })
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: construction rejects empty buffers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the underlying buffer in bytes.
    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.len * RECORD_LEN
    }

    /// The whole buffer.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.backing.as_slice()
    }

    /// Whether the bytes come from a memory map.
    pub fn is_mapped(&self) -> bool {
        match self.backing {
            Backing::Owned(_) => false,
            #[cfg(feature = "mmap")]
            Backing::Mapped(_) => true,
        }
    }

    /// Record at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`, like slice indexing.
    #[inline]
    pub fn record(&self, index: usize) -> RecordView<'_> {
        match self.get(index) {
            Some(record) => record,
            None => panic!(
                "record index {index} out of range for capture of {} records",
                self.len
            ),
        }
    }

    /// Record at `index`, or `None` when out of range.
    #[inline]
    pub fn get(&self, index: usize) -> Option<RecordView<'_>> {
        if index >= self.len {
            return None;
        }
        let start = index * RECORD_LEN;
        let bytes = &self.as_bytes()[start..start + RECORD_LEN];
        RecordView::from_slice(bytes)
    }

    /// Decoded timestamp of the record at `index`.
    #[inline]
    pub fn timestamp_ns(&self, index: usize) -> u64 {
        let start = index * RECORD_LEN;
        timestamp::record_nanos(&self.as_bytes()[start..start + RECORD_LEN])
    }

    /// Timestamp of the first record.
    pub fn first_timestamp_ns(&self) -> u64 {
        self.timestamp_ns(0)
    }

    /// Timestamp of the last record.
    pub fn last_timestamp_ns(&self) -> u64 {
        self.timestamp_ns(self.len - 1)
    }

    /// Iterate over all records in index order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = RecordView<'_>> + '_ {
        (0..self.len).map(move |i| self.record(i))
    }

    /// Iterate over the records in `range`, clamped to the capture.
    pub fn records(&self, range: Range<usize>) -> impl Iterator<Item = (usize, RecordView<'_>)> + '_ {
        let end = range.end.min(self.len);
        let start = range.start.min(end);
        (start..end).map(move |i| (i, self.record(i)))
    }
}

impl std::fmt::Debug for Capture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capture")
            .field("records", &self.len)
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erf::ErfRecordBuilder;

    fn capture_of(stamps: &[u64]) -> Capture {
        let records: Vec<_> = stamps
            .iter()
            .map(|&ns| ErfRecordBuilder::new().raw_nanos(ns).build())
            .collect();
        Capture::from_records("test", &records).unwrap()
    }

    #[test]
    fn test_empty_rejected() {
        let err = Capture::from_vec("empty", Vec::new()).unwrap_err();
        assert!(matches!(err, CaptureError::Empty { .. }));
    }

    #[test]
    fn test_partial_record_rejected() {
        let err = Capture::from_vec("short", vec![0u8; RECORD_LEN * 2 + 5]).unwrap_err();
        match err {
            CaptureError::PartialRecord { len, trailing, .. } => {
                assert_eq!(len, RECORD_LEN * 2 + 5);
                assert_eq!(trailing, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_indexing_and_timestamps() {
        let capture = capture_of(&[10, 20, 30]);
        assert_eq!(capture.len(), 3);
        assert!(!capture.is_empty());
        assert_eq!(capture.size_bytes(), 3 * RECORD_LEN);
        assert_eq!(capture.timestamp_ns(1), 20);
        assert_eq!(capture.record(2).timestamp_ns(), 30);
        assert_eq!(capture.first_timestamp_ns(), 10);
        assert_eq!(capture.last_timestamp_ns(), 30);
        assert!(capture.get(3).is_none());
        assert!(!capture.is_mapped());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_record_out_of_range_panics() {
        let capture = capture_of(&[10]);
        let _ = capture.record(1);
    }

    #[test]
    fn test_iter_in_order() {
        let capture = capture_of(&[5, 6, 7, 8]);
        let stamps: Vec<u64> = capture.iter().map(|r| r.timestamp_ns()).collect();
        assert_eq!(stamps, vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_records_range_clamped() {
        let capture = capture_of(&[5, 6, 7, 8]);
        let indices: Vec<usize> = capture.records(2..100).map(|(i, _)| i).collect();
        assert_eq!(indices, vec![2, 3]);
        assert_eq!(capture.records(10..20).count(), 0);
    }

    #[test]
    fn test_clone_shares_bytes() {
        let capture = capture_of(&[1, 2]);
        let clone = capture.clone();
        assert_eq!(capture.as_bytes().as_ptr(), clone.as_bytes().as_ptr());
    }
}
