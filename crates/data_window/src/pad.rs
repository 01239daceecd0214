//! Window-edge padding.

use contracts::{SensorTable, MICROS_PER_SECOND};

/// Extend a series with NaN rows towards `[window_start, window_end]`
///
/// Rows are placed on the series' own sample grid (`first − k·interval`,
/// `last + k·interval`) and never cross the window edges. The result is sorted.
pub fn data_padder(
    window_start: f64,
    window_end: f64,
    table: &SensorTable,
    sample_interval_s: f64,
) -> SensorTable {
    let mut result = table.sorted();
    let (Some(first), Some(last)) = (result.first_timestamp(), result.last_timestamp()) else {
        return result;
    };
    if !(sample_interval_s.is_finite() && sample_interval_s > 0.0) {
        return result;
    }
    let interval_us = sample_interval_s * MICROS_PER_SECOND;

    let mut new_timestamps = Vec::new();
    if window_start < first {
        let num = ((first - window_start) / interval_us) as usize;
        new_timestamps.extend((1..=num).map(|k| first - k as f64 * interval_us));
    }
    if window_end > last {
        let num = ((window_end - last) / interval_us) as usize;
        new_timestamps.extend((1..=num).map(|k| last + k as f64 * interval_us));
    }
    if new_timestamps.is_empty() {
        return result;
    }

    metrics::counter!("data_window_pad_rows_total").increment(new_timestamps.len() as u64);
    result.append_dataless(&new_timestamps);
    result.sorted()
}
