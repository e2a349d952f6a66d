//! End-to-end join scenarios over synthetic captures.

use std::io::Write;

use erfjoin_core::{
    join_sharded, Capture, CaptureSource, Compression, Correlator, EmitPolicy, ErfRecordBuilder,
    JoinConfig, JoinRecordReader, JoinRecordWriter, LatencySummary, MatchOutcome, OutcomeSink,
    RECORD_LEN,
};
use flate2::write::GzEncoder;

const SPACING_NS: u64 = 10_000;
const BASE_NS: u64 = 1_000_000;

/// One record per packet id, stamped `BASE_NS + id * SPACING_NS + skew`.
fn records(ids: impl IntoIterator<Item = u64>, skew: u64) -> Vec<[u8; RECORD_LEN]> {
    ids.into_iter()
        .map(|id| {
            ErfRecordBuilder::new()
                .raw_nanos(BASE_NS + id * SPACING_NS + skew)
                .frame(format!("packet-{id:08}").as_bytes())
                .build()
        })
        .collect()
}

fn capture(records: &[[u8; RECORD_LEN]]) -> Capture {
    Capture::from_records("synthetic", records).unwrap()
}

fn run(reference: &Capture, comparison: &Capture, config: &JoinConfig) -> Vec<MatchOutcome> {
    let mut outcomes: Vec<MatchOutcome> = Vec::new();
    Correlator::new()
        .join(reference, comparison, config, &mut outcomes)
        .unwrap();
    outcomes
}

// =============================================================================
// Classification
// =============================================================================

#[test]
fn test_lost_packet_after_matching_is_a_drop() {
    let reference = capture(&records(0..20, 0));
    let comparison = capture(&records((0..20).filter(|&id| id != 7), 500));
    let config = JoinConfig::default();

    let mut outcomes: Vec<MatchOutcome> = Vec::new();
    let counters = Correlator::new()
        .join(&reference, &comparison, &config, &mut outcomes)
        .unwrap();

    assert_eq!(counters.total_matched, 19);
    assert_eq!(counters.total_dropped_after_match, 1);
    assert_eq!(counters.total_dropped_before_match, 0);
    assert_eq!(outcomes[7], MatchOutcome::DroppedAfterFirstMatch);
    assert_eq!(
        outcomes[8],
        MatchOutcome::Matched {
            ref_idx: 8,
            cmp_idx: 7,
            latency_ns: 500,
        }
    );
}

#[test]
fn test_leading_misses_are_skew() {
    // The comparison tap started late: packets 0-2 were never seen there.
    let reference = capture(&records(0..10, 0));
    let comparison = capture(&records(3..10, 200));

    let outcomes = run(&reference, &comparison, &JoinConfig::default());
    assert!(outcomes[..3]
        .iter()
        .all(|o| *o == MatchOutcome::DroppedBeforeFirstMatch));
    assert!(outcomes[3..].iter().all(MatchOutcome::is_matched));
}

#[test]
fn test_reference_past_comparison_end_is_pruned() {
    let mut reference = records(0..5, 0);
    // Far beyond the comparison's last stamp plus the window.
    reference.extend(records(1_000_000..1_000_003, 0));
    let reference = capture(&reference);
    let comparison = capture(&records(0..5, 100));

    let mut correlator = Correlator::new();
    let mut outcomes: Vec<MatchOutcome> = Vec::new();
    let counters = correlator
        .join(&reference, &comparison, &JoinConfig::default(), &mut outcomes)
        .unwrap();

    assert_eq!(counters.total_matched, 5);
    assert_eq!(counters.total_pruned_out_of_time, 3);
    // Pruned records are never searched.
    assert_eq!(correlator.stats().locate_calls, 10);
}

#[test]
fn test_window_edge_and_widening() {
    // Comparison copies arrive 5 ms late; the window is 2.5 ms.
    let reference = capture(&records(0..4, 0));
    let comparison = capture(&records(0..4, 5_000_000));

    // The record nearest the window's end is always scanned, so packet 0
    // still finds its copy at the capture edge. The rest miss.
    let outcomes = run(&reference, &comparison, &JoinConfig::default());
    assert!(outcomes[0].is_matched());
    assert!(outcomes[1..]
        .iter()
        .all(|o| *o == MatchOutcome::DroppedBeforeFirstMatch));

    let wide = JoinConfig::from_window_us(10_000);
    let outcomes = run(&reference, &comparison, &wide);
    assert!(outcomes.iter().all(MatchOutcome::is_matched));
    assert_eq!(outcomes[3].latency_ns(), Some(5_000_000));
}

// =============================================================================
// Run properties
// =============================================================================

#[test]
fn test_every_selected_record_gets_one_outcome() {
    let reference = capture(&records(0..50, 0));
    let comparison = capture(&records((0..50).filter(|id| id % 9 != 4), 300));

    for (offset, length) in [(0, -1), (10, 15), (45, 100), (60, 5), (0, 0)] {
        let config = JoinConfig::default().with_range(offset, length);
        let mut outcomes: Vec<MatchOutcome> = Vec::new();
        let counters = Correlator::new()
            .join(&reference, &comparison, &config, &mut outcomes)
            .unwrap();

        let expected = config.clamp(reference.len()).len();
        assert_eq!(outcomes.len(), expected, "offset={offset} length={length}");
        assert_eq!(counters.total() as usize, expected);
    }
}

#[test]
fn test_rerun_is_identical() {
    let reference = capture(&records(0..30, 0));
    let comparison = capture(&records((0..30).filter(|id| id % 4 != 0), 700));
    let config = JoinConfig::default();

    let mut correlator = Correlator::new();
    let mut first: Vec<MatchOutcome> = Vec::new();
    let mut second: Vec<MatchOutcome> = Vec::new();
    let a = correlator
        .join(&reference, &comparison, &config, &mut first)
        .unwrap();
    let b = correlator
        .join(&reference, &comparison, &config, &mut second)
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(first, second);
}

#[test]
fn test_sharded_output_bytes_match_sequential() {
    let reference = capture(&records(0..400, 0));
    let comparison = capture(&records((0..400).filter(|id| id % 13 != 5), 900));
    let config = JoinConfig::default();

    let mut sequential = JoinRecordWriter::new(Vec::new(), EmitPolicy::All);
    Correlator::new()
        .join(&reference, &comparison, &config, &mut sequential)
        .unwrap();
    let sequential = sequential.into_inner().unwrap();

    let shards = join_sharded(&reference, &comparison, &config, 4, |_, _| {
        Ok(JoinRecordWriter::new(Vec::new(), EmitPolicy::All))
    })
    .unwrap();

    let mut sharded = Vec::new();
    for shard in shards {
        sharded.extend(shard.sink.into_inner().unwrap());
    }
    // Every record is emitted under `All` and join records do not carry
    // the drop kind, so the per-shard drop threshold cannot change the bytes.
    assert_eq!(sharded, sequential);
}

// =============================================================================
// Timestamps
// =============================================================================

/// 32.32 fixed point stamp: 10 s plus `sixteenths` sixteenths of a second
/// plus `extra` raw fraction units.
fn fixed_stamp(sixteenths: u64, extra: u64) -> u64 {
    (10u64 << 32) | (sixteenths * 0x1000_0000 + extra)
}

#[test]
fn test_fixed_point_join_applies_rounding_correction() {
    let reference: Vec<_> = (0..12u64)
        .map(|id| {
            ErfRecordBuilder::new()
                .fixed(fixed_stamp(id, 0))
                .frame(format!("packet-{id:08}").as_bytes())
                .build()
        })
        .collect();
    // 0x1005 fraction units truncate to 954 ns; bits 2 and 0 add 2 ns.
    let comparison: Vec<_> = (0..12u64)
        .filter(|&id| id != 6)
        .map(|id| {
            ErfRecordBuilder::new()
                .fixed(fixed_stamp(id, 0x1005))
                .frame(format!("packet-{id:08}").as_bytes())
                .build()
        })
        .collect();
    let reference = capture(&reference);
    let comparison = capture(&comparison);
    assert_eq!(reference.first_timestamp_ns(), 10_000_000_000);
    assert_eq!(reference.timestamp_ns(1), 10_062_500_000);

    let mut outcomes: Vec<MatchOutcome> = Vec::new();
    let mut summary = LatencySummary::new();
    let counters = Correlator::new()
        .join(
            &reference,
            &comparison,
            &JoinConfig::default(),
            &mut (&mut outcomes, &mut summary),
        )
        .unwrap();

    assert_eq!(counters.total_matched, 11);
    assert_eq!(counters.total_dropped_after_match, 1);
    assert_eq!(outcomes[6], MatchOutcome::DroppedAfterFirstMatch);
    assert_eq!(
        outcomes[7],
        MatchOutcome::Matched {
            ref_idx: 7,
            cmp_idx: 6,
            latency_ns: 956,
        }
    );
    assert!(outcomes
        .iter()
        .filter_map(MatchOutcome::latency_ns)
        .all(|latency| latency == 956));
    assert_eq!(summary.min(), Some(956));
    assert_eq!(summary.max(), Some(956));
}

// =============================================================================
// Files
// =============================================================================

#[test]
fn test_join_gzip_capture_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let ref_path = dir.path().join("tap0.erf");
    let cmp_path = dir.path().join("tap1.erf.gz");

    std::fs::write(&ref_path, records(0..25, 0).concat()).unwrap();
    let mut encoder = GzEncoder::new(
        std::fs::File::create(&cmp_path).unwrap(),
        flate2::Compression::default(),
    );
    encoder
        .write_all(&records((0..25).filter(|&id| id != 12), 1_000).concat())
        .unwrap();
    encoder.finish().unwrap();

    let reference = CaptureSource::open(&ref_path).unwrap();
    let comparison = CaptureSource::open(&cmp_path).unwrap();
    assert_eq!(comparison.compression(), Compression::Gzip);
    assert_eq!(comparison.capture().len(), 24);

    let mut sink = (
        JoinRecordWriter::new(Vec::new(), EmitPolicy::Losses),
        LatencySummary::new(),
    );
    let counters = Correlator::new()
        .join(
            reference.capture(),
            comparison.capture(),
            &JoinConfig::default(),
            &mut sink,
        )
        .unwrap();
    let (writer, summary) = sink;

    assert_eq!(counters.total_matched, 24);
    assert_eq!(counters.total_dropped_after_match, 1);
    assert_eq!(summary.count(), 24);
    assert_eq!(summary.min(), Some(1_000));
    assert_eq!(summary.max(), Some(1_000));

    let output = writer.into_inner().unwrap();
    let decoded: Vec<_> = JoinRecordReader::new(&output)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(decoded.len(), 25);
    let lost: Vec<u64> = decoded
        .iter()
        .filter(|r| !r.matched)
        .map(|r| r.ref_idx)
        .collect();
    assert_eq!(lost, vec![12]);

    let mut replay = LatencySummary::new();
    decoded.iter().for_each(|r| replay.record_join(r));
    assert_eq!(replay.stats(), summary.stats());
}

#[test]
fn test_sink_sees_reference_bytes() {
    struct Timestamps(Vec<u64>);

    impl OutcomeSink for Timestamps {
        fn emit(
            &mut self,
            _: u64,
            reference: erfjoin_core::RecordView<'_>,
            _: &MatchOutcome,
        ) -> erfjoin_core::Result<()> {
            self.0.push(reference.timestamp_ns());
            Ok(())
        }
    }

    let reference = capture(&records(0..3, 0));
    let comparison = capture(&records(0..3, 0));
    let mut sink = Timestamps(Vec::new());
    Correlator::new()
        .join(&reference, &comparison, &JoinConfig::default(), &mut sink)
        .unwrap();
    assert_eq!(sink.0, vec![BASE_NS, BASE_NS + SPACING_NS, BASE_NS + 2 * SPACING_NS]);
}
