//! Fuzz target for the join engine.
//!
//! Splits the input into two captures and a window, then joins them.
//! Covers:
//! - Non-monotonic and colliding timestamps
//! - Raw-nanosecond and fixed point records mixed in one capture
//! - Windows near the i64 limits

#![no_main]

use erfjoin_core::{CaptureSource, Correlator, JoinConfig, MatchOutcome, RECORD_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 9 {
        return;
    }
    let mut window = [0u8; 8];
    window.copy_from_slice(&data[..8]);
    let split = data[8] as usize;
    let records = &data[9..];

    // Whole records only, so both captures load
    let whole = records.len() / RECORD_LEN * RECORD_LEN;
    let split = (split % 8 + 1).min(whole / RECORD_LEN) * RECORD_LEN;
    if split == 0 || split == whole {
        return;
    }

    let (Ok(reference), Ok(comparison)) = (
        CaptureSource::from_bytes("dag0", records[..split].to_vec()),
        CaptureSource::from_bytes("dag1", records[split..whole].to_vec()),
    ) else {
        return;
    };

    let config = JoinConfig::new(u64::from_le_bytes(window));
    let mut outcomes: Vec<MatchOutcome> = Vec::new();
    let counters = Correlator::new()
        .join(reference.capture(), comparison.capture(), &config, &mut outcomes)
        .expect("in-memory sinks never fail");

    // One outcome per record, whatever the input.
    assert_eq!(outcomes.len(), reference.capture().len());
    assert_eq!(counters.total() as usize, outcomes.len());
});
