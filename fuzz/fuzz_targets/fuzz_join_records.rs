//! Fuzz target for join record decoding.
//!
//! Arbitrary bytes must decode or fail cleanly; a decoded record must
//! re-encode to the bytes it came from.

#![no_main]

use erfjoin_core::{JoinRecordReader, LatencySummary, JOIN_RECORD_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut summary = LatencySummary::new();
    for (i, record) in JoinRecordReader::new(data).enumerate() {
        let Ok(record) = record else {
            break;
        };
        let start = i * JOIN_RECORD_LEN;
        let encoded = record.encode();
        // `matched` is read as non-zero; only canonical 0/1 values round-trip.
        if data[start + 80..start + 88].iter().skip(1).all(|&b| b == 0) && data[start + 80] <= 1 {
            assert_eq!(&encoded[..], &data[start..start + JOIN_RECORD_LEN]);
        }
        summary.record_join(&record);
    }
    let _ = summary.stats();
});
