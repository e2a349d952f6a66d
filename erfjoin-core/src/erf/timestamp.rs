//! ERF timestamp decoding.
//!
//! DAG cards stamp each record with a 64-bit little-endian timestamp. The
//! usual encoding is 32.32 fixed point seconds. Records whose flags byte has
//! the reserved bit ([`FLAG_RAW_NANOS`]) set carry a plain nanosecond counter
//! instead.
//!
//! The fixed point conversion truncates, and the card's low fraction bits
//! are biased. The correction applied here (+1 ns for bit 2, +1 ns for
//! either of bits 1 and 0) must stay bit-for-bit identical, otherwise
//! latencies computed against older join files stop being comparable.

use super::{FLAG_RAW_NANOS, FLAGS_OFFSET, TIMESTAMP_OFFSET};

/// Nanoseconds per second.
pub const SECS_TO_NANOS: u64 = 1_000_000_000;

/// Convert a raw 32.32 fixed point timestamp into nanoseconds.
#[inline]
pub fn fixed_to_nanos(fixed: u64) -> u64 {
    let mut subsecs = ((fixed & 0xFFFF_FFFF) * SECS_TO_NANOS) >> 32;
    let seconds = (fixed >> 32) * SECS_TO_NANOS;

    if fixed & 0x4 != 0 {
        subsecs += 1;
    }
    if fixed & 0x3 != 0 {
        subsecs += 1;
    }

    seconds + subsecs
}

/// Convert a raw timestamp field into nanoseconds, honouring the flags byte.
#[inline]
pub fn raw_to_nanos(raw: u64, flags: u8) -> u64 {
    if flags & FLAG_RAW_NANOS != 0 {
        raw
    } else {
        fixed_to_nanos(raw)
    }
}

/// Decode the timestamp of a record given its raw bytes.
///
/// `record` must hold at least the 16-byte ERF header.
#[inline]
pub fn record_nanos(record: &[u8]) -> u64 {
    let mut ts = [0u8; 8];
    ts.copy_from_slice(&record[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 8]);
    raw_to_nanos(u64::from_le_bytes(ts), record[FLAGS_OFFSET])
}

/// Encode nanoseconds as a 32.32 fixed point value.
///
/// The inverse of [`fixed_to_nanos`] up to the rounding correction: decoding
/// the result lands within a couple of nanoseconds of `nanos`.
pub fn nanos_to_fixed(nanos: u64) -> u64 {
    let seconds = nanos / SECS_TO_NANOS;
    let subsecs = nanos % SECS_TO_NANOS;
    let fraction = (subsecs << 32) / SECS_TO_NANOS;
    (seconds << 32) | fraction
}
