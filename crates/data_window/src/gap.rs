//! Gap filling.
//!
//! Long series are split into index ranges held in a work queue instead of
//! being recursed on. Neighbouring ranges share their boundary sample, so every
//! pair of consecutive samples is scanned by exactly one range and a split can
//! never hide a gap.

use std::collections::VecDeque;

use contracts::{SensorTable, MICROS_PER_SECOND};
use tracing::instrument;

/// Inclusive index range `[lo, hi]` plus its split depth
#[derive(Debug, Clone, Copy)]
struct Chunk {
    lo: usize,
    hi: usize,
    depth: u32,
}

/// Fill every gap longer than `max(gap_time_s, sample_interval_s)` with NaN rows
///
/// Synthesized rows sit at `tᵢ + k·interval` after the sample opening the gap,
/// as many as needed to leave no spacing wider than one interval. This also
/// holds for unevenly sampled series and for series with duplicate rows.
/// Series longer than `chunk_size` are halved until they are short enough or
/// the split depth reaches `⌈log₂ n⌉ + 1`. The result is sorted.
#[instrument(
    level = "debug",
    name = "data_window_gap_filler",
    skip(table),
    fields(rows = table.len())
)]
pub fn gap_filler(
    table: &SensorTable,
    sample_interval_s: f64,
    gap_time_s: f64,
    chunk_size: usize,
) -> SensorTable {
    let mut result = table.sorted();
    if result.len() < 2 || !(sample_interval_s.is_finite() && sample_interval_s > 0.0) {
        return result;
    }

    let new_timestamps = find_gap_timestamps(
        result.timestamps(),
        sample_interval_s * MICROS_PER_SECOND,
        gap_time_s.max(sample_interval_s) * MICROS_PER_SECOND,
        chunk_size.max(2),
    );
    if new_timestamps.is_empty() {
        return result;
    }

    metrics::counter!("data_window_gap_rows_total").increment(new_timestamps.len() as u64);
    result.append_dataless(&new_timestamps);
    result.sorted()
}

fn find_gap_timestamps(
    timestamps: &[f64],
    interval_us: f64,
    threshold_us: f64,
    chunk_size: usize,
) -> Vec<f64> {
    let n = timestamps.len();
    let max_depth = (n as f64).log2().ceil() as u32 + 1;
    let mut new_timestamps = Vec::new();
    let mut queue = VecDeque::from([Chunk {
        lo: 0,
        hi: n - 1,
        depth: 0,
    }]);

    while let Some(chunk) = queue.pop_front() {
        let slice = &timestamps[chunk.lo..=chunk.hi];
        if slice.len() > chunk_size && chunk.depth < max_depth {
            let mid = chunk.lo + (chunk.hi - chunk.lo) / 2;
            queue.push_back(Chunk {
                lo: chunk.lo,
                hi: mid,
                depth: chunk.depth + 1,
            });
            queue.push_back(Chunk {
                lo: mid,
                hi: chunk.hi,
                depth: chunk.depth + 1,
            });
            continue;
        }
        for pair in slice.windows(2) {
            let diff = pair[1] - pair[0];
            if diff <= threshold_us {
                continue;
            }
            let num_new = interval_steps(diff, interval_us) - 1;
            new_timestamps.extend((1..=num_new).map(|k| pair[0] + k as f64 * interval_us));
        }
    }
    new_timestamps
}

/// Grid steps needed so that no remaining spacing exceeds `interval_us`
///
/// Exact multiples (within float noise) are not rounded up.
fn interval_steps(diff_us: f64, interval_us: f64) -> usize {
    let ratio = diff_us / interval_us;
    let nearest = ratio.round();
    let steps = if (ratio - nearest).abs() < 1e-6 {
        nearest
    } else {
        ratio.ceil()
    };
    steps.max(1.0) as usize
}
