//! Timestamp alignment across instruments.
//!
//! Each instrument's series is already in non-decreasing time order, so every
//! alignment here is a linear merge rather than a lookup table.

use chrono::NaiveTime;

/// Pair up indices of two series whose timestamps are exactly equal.
///
/// Equal timestamps that repeat within a series are paired in order; surplus
/// repeats on either side are dropped.
pub fn align_exact(a: &[NaiveTime], b: &[NaiveTime]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i] < b[j] {
            i += 1;
        } else if a[i] > b[j] {
            j += 1;
        } else {
            let t = a[i];
            let run_a = a[i..].iter().take_while(|&&x| x == t).count();
            let run_b = b[j..].iter().take_while(|&&x| x == t).count();
            for k in 0..run_a.min(run_b) {
                pairs.push((i + k, j + k));
            }
            i += run_a;
            j += run_b;
        }
    }

    pairs
}

/// Index of the last timestamp at or before `t`.
pub fn asof_index(timestamps: &[NaiveTime], t: NaiveTime) -> Option<usize> {
    timestamps.partition_point(|&x| x <= t).checked_sub(1)
}

/// As-of index into `other` for every timestamp of `target`.
pub fn asof_indices(target: &[NaiveTime], other: &[NaiveTime]) -> Vec<Option<usize>> {
    let mut result = Vec::with_capacity(target.len());
    let mut j = 0;
    for &t in target {
        while j < other.len() && other[j] <= t {
            j += 1;
        }
        result.push(j.checked_sub(1));
    }
    result
}

/// One step of a merged multi-instrument timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEvent {
    pub timestamp: NaiveTime,
    /// Position of the instrument in the input slice.
    pub instrument: usize,
    /// Index into that instrument's own series.
    pub index: usize,
}

/// Merge several series into one timeline. Equal timestamps keep instrument
/// order, then each instrument's own order.
pub fn unified_timeline(series: &[Vec<NaiveTime>]) -> Vec<TimelineEvent> {
    let mut events: Vec<TimelineEvent> = series
        .iter()
        .enumerate()
        .flat_map(|(instrument, timestamps)| {
            timestamps
                .iter()
                .enumerate()
                .map(move |(index, &timestamp)| TimelineEvent {
                    timestamp,
                    instrument,
                    index,
                })
        })
        .collect();
    events.sort_by_key(|e| e.timestamp);
    events
}
