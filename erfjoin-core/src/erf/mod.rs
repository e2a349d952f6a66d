//! ERF (Extensible Record Format) capture records.
//!
//! Every capture handled by erfjoin is a flat array of fixed-size records
//! written by a DAG card:
//!
//! ```text
//!  0               8    9    10        12        14        16   17   18            80
//!  +---------------+----+----+---------+---------+---------+----+----+-------------+
//!  | timestamp LE  |type|flag| rlen BE | lctr BE | wlen BE |off |pad | frame bytes |
//!  +---------------+----+----+---------+---------+---------+----+----+-------------+
//! ```
//!
//! The first 18 bytes are tap-local: two taps on the same link see the same
//! frame with different timestamps, loss counters and padding. Everything
//! after them is the packet identity.

pub mod timestamp;

/// Size of one capture record (the stride of a capture buffer).
pub const RECORD_LEN: usize = 80;

/// Size of the ERF record header.
pub const ERF_HEADER_LEN: usize = 16;

/// Ethernet offset/pad bytes following the ERF header.
pub const ETH_PAD_LEN: usize = 2;

/// Start of the identity byte range (header plus ethernet padding).
pub const IDENTITY_OFFSET: usize = ERF_HEADER_LEN + ETH_PAD_LEN;

/// Length of the identity byte range.
pub const IDENTITY_LEN: usize = RECORD_LEN - IDENTITY_OFFSET;

/// Reserved flag bit: the timestamp field holds raw nanoseconds.
pub const FLAG_RAW_NANOS: u8 = 0x40;

/// ERF record type for Ethernet.
pub const TYPE_ETH: u8 = 2;

/// Highest assigned ERF record type.
pub const TYPE_MAX: u8 = 48;

/// Bit of the type byte announcing extension headers.
pub const TYPE_EXT_HEADER: u8 = 0x80;

const ETHERTYPE_IPV4: [u8; 2] = [0x08, 0x00];
const ETHERTYPE_VLAN: [u8; 2] = [0x81, 0x00];

pub(crate) const TIMESTAMP_OFFSET: usize = 0;
pub(crate) const TYPE_OFFSET: usize = 8;
pub(crate) const FLAGS_OFFSET: usize = 9;
pub(crate) const RLEN_OFFSET: usize = 10;
pub(crate) const LCTR_OFFSET: usize = 12;
pub(crate) const WLEN_OFFSET: usize = 14;

/// Read-only view of one capture record.
#[derive(Clone, Copy)]
pub struct RecordView<'a> {
    bytes: &'a [u8; RECORD_LEN],
}

impl<'a> RecordView<'a> {
    /// Wrap exactly one record worth of bytes.
    #[inline]
    pub fn new(bytes: &'a [u8; RECORD_LEN]) -> Self {
        Self { bytes }
    }

    /// Wrap a slice, returning `None` unless it is exactly one record long.
    #[inline]
    pub fn from_slice(bytes: &'a [u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self::new)
    }

    /// Raw record bytes.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8; RECORD_LEN] {
        self.bytes
    }

    /// Raw 64-bit timestamp field.
    #[inline]
    pub fn raw_timestamp(&self) -> u64 {
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&self.bytes[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 8]);
        u64::from_le_bytes(ts)
    }

    /// Decoded timestamp in nanoseconds.
    #[inline]
    pub fn timestamp_ns(&self) -> u64 {
        timestamp::raw_to_nanos(self.raw_timestamp(), self.flags())
    }

    /// ERF record type.
    #[inline]
    pub fn record_type(&self) -> u8 {
        self.bytes[TYPE_OFFSET]
    }

    /// ERF flags byte.
    #[inline]
    pub fn flags(&self) -> u8 {
        self.bytes[FLAGS_OFFSET]
    }

    /// Whether the timestamp field is a raw nanosecond counter.
    #[inline]
    pub fn is_raw_nanos(&self) -> bool {
        self.flags() & FLAG_RAW_NANOS != 0
    }

    /// Record length as written by the card.
    #[inline]
    pub fn rlen(&self) -> u16 {
        self.be_u16(RLEN_OFFSET)
    }

    /// Loss counter: packets dropped by the card before this one.
    #[inline]
    pub fn lctr(&self) -> u16 {
        self.be_u16(LCTR_OFFSET)
    }

    /// Wire length of the original frame.
    #[inline]
    pub fn wlen(&self) -> u16 {
        self.be_u16(WLEN_OFFSET)
    }

    /// Identity bytes: the record without its tap-local header.
    #[inline]
    pub fn identity(&self) -> &'a [u8] {
        &self.bytes[IDENTITY_OFFSET..]
    }

    /// Whether both records carry the same packet.
    #[inline]
    pub fn same_packet(&self, other: &RecordView<'_>) -> bool {
        self.identity() == other.identity()
    }

    /// IPv4 protocol number of the captured Ethernet frame, looking through
    /// one 802.1Q tag. `None` for non-Ethernet records and non-IPv4 frames.
    pub fn ip_protocol(&self) -> Option<u8> {
        if self.record_type() & !TYPE_EXT_HEADER != TYPE_ETH {
            return None;
        }
        let frame = self.identity();
        let mut ethertype_at = 12;
        if frame[ethertype_at..ethertype_at + 2] == ETHERTYPE_VLAN {
            ethertype_at += 4;
        }
        if frame[ethertype_at..ethertype_at + 2] != ETHERTYPE_IPV4 {
            return None;
        }
        let ip = &frame[ethertype_at + 2..];
        (ip[0] >> 4 == 4).then_some(ip[9])
    }

    /// Whether the header is plausible for a fixed-stride capture record:
    /// `rlen` equals the stride and the type is an assigned ERF type.
    pub fn has_capture_header(&self) -> bool {
        let record_type = self.record_type() & !TYPE_EXT_HEADER;
        self.rlen() as usize == RECORD_LEN && (1..=TYPE_MAX).contains(&record_type)
    }

    #[inline]
    fn be_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.bytes[offset], self.bytes[offset + 1]])
    }
}

impl std::fmt::Debug for RecordView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordView")
            .field("timestamp_ns", &self.timestamp_ns())
            .field("type", &self.record_type())
            .field("flags", &format_args!("{:#04x}", self.flags()))
            .field("rlen", &self.rlen())
            .field("lctr", &self.lctr())
            .field("wlen", &self.wlen())
            .finish()
    }
}

/// Whether `bytes` is a whole number of records that all carry a plausible
/// capture header.
pub fn looks_like_records(bytes: &[u8]) -> bool {
    !bytes.is_empty()
        && bytes.len() % RECORD_LEN == 0
        && bytes
            .chunks_exact(RECORD_LEN)
            .filter_map(RecordView::from_slice)
            .all(|record| record.has_capture_header())
}

/// Timestamp encoding used by [`ErfRecordBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stamp {
    Fixed(u64),
    RawNanos(u64),
}

/// Builds synthetic capture records.
///
/// ```
/// use erfjoin_core::erf::{ErfRecordBuilder, RecordView};
///
/// let bytes = ErfRecordBuilder::new()
///     .raw_nanos(1_000)
///     .frame(b"hello")
///     .build();
/// let record = RecordView::new(&bytes);
/// assert_eq!(record.timestamp_ns(), 1_000);
/// assert_eq!(&record.identity()[..5], b"hello");
/// ```
#[derive(Clone, Debug)]
pub struct ErfRecordBuilder {
    stamp: Stamp,
    record_type: u8,
    flags: u8,
    lctr: u16,
    wlen: Option<u16>,
    frame: [u8; IDENTITY_LEN],
    frame_len: usize,
}

impl Default for ErfRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ErfRecordBuilder {
    /// Ethernet record with a zero timestamp and an all-zero frame.
    pub fn new() -> Self {
        Self {
            stamp: Stamp::Fixed(0),
            record_type: TYPE_ETH,
            flags: 0,
            lctr: 0,
            wlen: None,
            frame: [0u8; IDENTITY_LEN],
            frame_len: 0,
        }
    }

    /// Raw 32.32 fixed point timestamp.
    pub fn fixed(mut self, fixed: u64) -> Self {
        self.stamp = Stamp::Fixed(fixed);
        self
    }

    /// Timestamp in nanoseconds, encoded as a raw nanosecond counter.
    pub fn raw_nanos(mut self, nanos: u64) -> Self {
        self.stamp = Stamp::RawNanos(nanos);
        self
    }

    /// ERF record type.
    pub fn record_type(mut self, record_type: u8) -> Self {
        self.record_type = record_type;
        self
    }

    /// Extra flag bits (the raw-nanos bit is managed by the timestamp setters).
    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags & !FLAG_RAW_NANOS;
        self
    }

    /// Loss counter.
    pub fn lctr(mut self, lctr: u16) -> Self {
        self.lctr = lctr;
        self
    }

    /// Wire length. Defaults to the frame length.
    pub fn wlen(mut self, wlen: u16) -> Self {
        self.wlen = Some(wlen);
        self
    }

    /// Frame bytes, truncated to the space left after the header.
    pub fn frame(mut self, frame: &[u8]) -> Self {
        let n = frame.len().min(IDENTITY_LEN);
        self.frame = [0u8; IDENTITY_LEN];
        self.frame[..n].copy_from_slice(&frame[..n]);
        self.frame_len = n;
        self
    }

    /// Produce the record bytes.
    pub fn build(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        let (raw, flags) = match self.stamp {
            Stamp::Fixed(fixed) => (fixed, self.flags),
            Stamp::RawNanos(nanos) => (nanos, self.flags | FLAG_RAW_NANOS),
        };
        out[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 8].copy_from_slice(&raw.to_le_bytes());
        out[TYPE_OFFSET] = self.record_type;
        out[FLAGS_OFFSET] = flags;
        out[RLEN_OFFSET..RLEN_OFFSET + 2].copy_from_slice(&(RECORD_LEN as u16).to_be_bytes());
        out[LCTR_OFFSET..LCTR_OFFSET + 2].copy_from_slice(&self.lctr.to_be_bytes());
        let wlen = self.wlen.unwrap_or(self.frame_len as u16);
        out[WLEN_OFFSET..WLEN_OFFSET + 2].copy_from_slice(&wlen.to_be_bytes());
        out[IDENTITY_OFFSET..].copy_from_slice(&self.frame);
        out
    }
}
