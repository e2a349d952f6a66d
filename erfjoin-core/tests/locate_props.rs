//! Property-based tests for the locator and the timestamp decoder.

use proptest::prelude::*;

use erfjoin_core::erf::timestamp::{fixed_to_nanos, nanos_to_fixed, raw_to_nanos};
use erfjoin_core::erf::FLAG_RAW_NANOS;
use erfjoin_core::{locate_nearest, IndexCursor};

/// Strictly increasing timestamps built from positive gaps.
fn stamps(gaps: &[u64]) -> Vec<u64> {
    gaps.iter()
        .scan(1_000u64, |t, gap| {
            *t += gap;
            Some(*t)
        })
        .collect()
}

fn nearest_distance(stamps: &[u64], target: i64) -> u64 {
    stamps
        .iter()
        .map(|&ts| (target - ts as i64).unsigned_abs())
        .min()
        .unwrap_or(0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn locate_finds_a_nearest_record(
        gaps in prop::collection::vec(1u64..5_000, 1..200),
        hint in 0usize..300,
        target in -10_000i64..1_200_000,
    ) {
        let stamps = stamps(&gaps);
        let located = locate_nearest(stamps.len(), |i| stamps[i], hint, target);

        prop_assert!(located.index < stamps.len());
        let found = (target - stamps[located.index] as i64).unsigned_abs();
        prop_assert_eq!(found, nearest_distance(&stamps, target));
    }

    #[test]
    fn locate_boundaries_take_fast_path(
        gaps in prop::collection::vec(1u64..5_000, 1..200),
        hint in 0usize..300,
        below in 0i64..10_000,
        above in 0i64..10_000,
    ) {
        let stamps = stamps(&gaps);
        let first = stamps[0] as i64;
        let last = *stamps.last().unwrap() as i64;

        let low = locate_nearest(stamps.len(), |i| stamps[i], hint, first - below);
        prop_assert_eq!(low.index, 0);
        prop_assert_eq!(low.probes, 0);

        let high = locate_nearest(stamps.len(), |i| stamps[i], hint, last + above);
        prop_assert_eq!(high.index, stamps.len() - 1);
        prop_assert_eq!(high.probes, 0);
    }

    #[test]
    fn cursor_probes_are_linear_for_monotonic_queries(
        gaps in prop::collection::vec(1u64..5_000, 2..500),
        steps in prop::collection::vec(0i64..3_000, 1..500),
        width in 0i64..20_000,
    ) {
        let stamps = stamps(&gaps);
        let mut cursor = IndexCursor::new();
        let mut target = 0i64;
        let mut probes = 0u64;

        for step in &steps {
            target += step;
            let ((lo, hi), spent) = cursor.range(
                stamps.len(),
                |i| stamps[i],
                target - 250,
                target + width,
            );
            prop_assert!(lo <= hi);
            probes += spent;
        }

        // Each hint only ever moves forward, plus a few probes per call.
        let bound = 2 * stamps.len() as u64 + 8 * steps.len() as u64;
        prop_assert!(probes <= bound, "probes {} > bound {}", probes, bound);
    }

    #[test]
    fn fixed_point_decode_is_near_inverse(nanos in 0u64..(1u64 << 40)) {
        let decoded = fixed_to_nanos(nanos_to_fixed(nanos));
        prop_assert!(decoded.abs_diff(nanos) <= 2, "{} -> {}", nanos, decoded);
    }

    #[test]
    fn fixed_point_rounding_adds_at_most_two(fixed in any::<u64>()) {
        let truncated = (fixed >> 32) * 1_000_000_000
            + (((fixed & 0xFFFF_FFFF) * 1_000_000_000) >> 32);
        let decoded = fixed_to_nanos(fixed);
        let expected = truncated + u64::from(fixed & 0x4 != 0) + u64::from(fixed & 0x3 != 0);
        prop_assert_eq!(decoded, expected);
    }

    #[test]
    fn raw_flag_passes_through(raw in any::<u64>(), flags in any::<u8>()) {
        let decoded = raw_to_nanos(raw, flags | FLAG_RAW_NANOS);
        prop_assert_eq!(decoded, raw);
        prop_assert_eq!(raw_to_nanos(raw, flags & !FLAG_RAW_NANOS), fixed_to_nanos(raw));
    }
}
