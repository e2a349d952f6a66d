//! Nearest-timestamp search with a moving start hint.
//!
//! The join asks, for every reference record, which comparison records fall
//! inside a time window. Reference records arrive in time order, so the
//! answer for record `i + 1` is almost always a few records past the answer
//! for record `i`. The locator walks linearly from the previous answer and
//! stops at the first step that moves away from the target. On monotonic
//! queries this costs O(1) amortized probes per call, against O(log n) for a
//! cold binary search.
//!
//! The stop rule is a local one: it assumes the timestamps are monotonic, so
//! the distance to the target is unimodal along the walk. Runs of equal
//! timestamps can make it stop one step early or late. That behaviour is
//! kept so latencies stay comparable with historical join output.

/// Result of one locator call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Located {
    /// Index of the record nearest to the target
    pub index: usize,
    /// Timestamps evaluated by the walk (zero on the boundary fast paths)
    pub probes: u64,
}

/// Find the index whose timestamp is nearest to `target_ns`.
///
/// `len` must be non-zero and `timestamp_ns(i)` must be defined for every
/// `i < len`. A `start_hint` past the end is clamped to the last index.
pub fn locate_nearest<F>(len: usize, timestamp_ns: F, start_hint: usize, target_ns: i64) -> Located
where
    F: Fn(usize) -> u64,
{
    debug_assert!(len > 0, "locate_nearest on an empty capture");

    let last = len - 1;
    if target_ns <= timestamp_ns(0) as i64 {
        return Located { index: 0, probes: 0 };
    }
    if target_ns >= timestamp_ns(last) as i64 {
        return Located {
            index: last,
            probes: 0,
        };
    }

    let start = start_hint.min(last);
    let start_ts = timestamp_ns(start) as i64;
    let forward = target_ns > start_ts;

    let mut best_diff = target_ns.abs_diff(start_ts);
    let mut best = start;
    let mut probes = 0u64;
    let mut i = start;

    loop {
        probes += 1;
        let diff = target_ns.abs_diff(timestamp_ns(i) as i64);

        if diff < best_diff {
            best_diff = diff;
            best = i;
        }

        // Walking away from the target.
        if diff > best_diff {
            break;
        }

        match step(i, forward, last) {
            Some(next) => i = next,
            None => break,
        }
    }

    Located {
        index: best,
        probes,
    }
}

#[inline]
fn step(i: usize, forward: bool, last: usize) -> Option<usize> {
    if forward {
        (i < last).then_some(i + 1)
    } else {
        i.checked_sub(1)
    }
}

/// Start hints carried from one window lookup to the next.
///
/// One cursor belongs to one join run. Queries must arrive in
/// non-decreasing target order for the hints to pay off; for random access,
/// [`IndexCursor::reset`] before each lookup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexCursor {
    /// Hint for the window's lower bound
    pub start: usize,
    /// Hint for the window's upper bound
    pub end: usize,
}

impl IndexCursor {
    /// Cursor seeded at index 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reseed both hints at index 0.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Convert a time window into an inclusive index range and remember
    /// both ends as the next hints.
    ///
    /// Returns the range and the probes spent finding it.
    pub fn range<F>(
        &mut self,
        len: usize,
        timestamp_ns: F,
        start_ns: i64,
        end_ns: i64,
    ) -> ((usize, usize), u64)
    where
        F: Fn(usize) -> u64,
    {
        let lo = locate_nearest(len, &timestamp_ns, self.start, start_ns);
        let hi = locate_nearest(len, &timestamp_ns, self.end, end_ns);
        self.start = lo.index;
        self.end = hi.index;
        ((lo.index, hi.index), lo.probes + hi.probes)
    }
}
