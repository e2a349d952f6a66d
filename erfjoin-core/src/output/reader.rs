//! Reading join records back.

use crate::error::JoinRecordError;

use super::{JoinRecord, JOIN_RECORD_LEN};

/// Iterator over the join records in a byte buffer.
///
/// A trailing partial record yields one `Truncated` error, after which the
/// iterator is exhausted.
#[derive(Debug, Clone)]
pub struct JoinRecordReader<'a> {
    bytes: &'a [u8],
    index: u64,
}

impl<'a> JoinRecordReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, index: 0 }
    }

    /// Number of whole records remaining.
    pub fn remaining(&self) -> usize {
        self.bytes.len() / JOIN_RECORD_LEN
    }
}

impl Iterator for JoinRecordReader<'_> {
    type Item = Result<JoinRecord, JoinRecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bytes.is_empty() {
            return None;
        }

        let result = JoinRecord::decode(self.index, self.bytes);
        match result {
            Ok(_) => self.bytes = &self.bytes[JOIN_RECORD_LEN..],
            Err(_) => self.bytes = &[],
        }
        self.index += 1;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let whole = self.remaining();
        let partial = usize::from(self.bytes.len() % JOIN_RECORD_LEN != 0);
        (usize::from(!self.bytes.is_empty()), Some(whole + partial))
    }
}
