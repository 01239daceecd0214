//! Time-array correction.
//!
//! Arrays handled here are in epoch seconds; offsets stored on the analysis
//! are microseconds.

use contracts::{ContractError, MICROS_PER_SECOND};

use crate::analysis::TimeSyncAnalysis;
use crate::data::TimeSyncData;
use crate::packet_duration::samples_per_packet;

/// True if the analysis has packets and its sensor settings never change
///
/// One packet is trivially consistent.
pub fn validate_sensors(analysis: &TimeSyncAnalysis) -> bool {
    match analysis.num_packets() {
        0 => {
            tracing::warn!(station_id = %analysis.station_id(), "no time sync data to validate");
            false
        }
        1 => true,
        _ => analysis.is_sample_rate_consistent() && analysis.is_start_timestamp_consistent(),
    }
}

/// Rebuild an evenly sampled time array around the best packet
///
/// `num_samples` is the number of samples in one packet (defaults to the
/// standard packet size for the sample rate). `time_start_array` holds one
/// start time per packet in seconds (defaults to the packet start times).
/// Samples before the best packet count backwards from its start time and
/// samples after count forwards, so drift of earlier packets does not leak
/// into the result.
///
/// # Errors
/// - The station start time or sample rate changes between packets
/// - `time_start_array` does not have one entry per packet
pub fn update_evenly_sampled_time_array(
    analysis: &TimeSyncAnalysis,
    num_samples: Option<f64>,
    time_start_array: Option<&[f64]>,
) -> Result<Vec<f64>, ContractError> {
    if !validate_sensors(analysis) {
        return Err(ContractError::inconsistent_station(
            analysis.station_id().clone(),
        ));
    }

    let default_starts: Vec<f64>;
    let time_start_array = match time_start_array {
        Some(starts) => starts,
        None => {
            default_starts = analysis
                .start_times()
                .into_iter()
                .map(|t| t / MICROS_PER_SECOND)
                .collect();
            &default_starts
        }
    };

    let num_files = analysis.num_packets();
    if time_start_array.len() != num_files {
        return Err(ContractError::length_mismatch(
            "time start array",
            num_files,
            time_start_array.len(),
        ));
    }

    let sample_rate_hz = analysis
        .sample_rate_hz()
        .ok_or_else(|| ContractError::empty_analysis(analysis.station_id().clone()))?;
    let num_samples = match num_samples {
        Some(n) => n,
        None => default_samples_per_packet(analysis, sample_rate_hz),
    };
    let t_dt = 1.0 / sample_rate_hz;

    let decoder_idx = analysis.best_latency_index();
    let samples_before = (decoder_idx as f64 * num_samples).trunc().max(0.0) as usize;
    let samples_after =
        (((num_files - decoder_idx) as f64 * num_samples).round() as i64 - 1).max(0) as usize;
    let best_start_sec = time_start_array[decoder_idx];

    // `before` includes the anchor sample itself
    let mut corrected: Vec<f64> = (0..=samples_before)
        .rev()
        .map(|t| best_start_sec - t as f64 * t_dt)
        .collect();
    corrected.extend((1..=samples_after).map(|t| best_start_sec + t as f64 * t_dt));
    Ok(corrected)
}

fn default_samples_per_packet(analysis: &TimeSyncAnalysis, sample_rate_hz: f64) -> f64 {
    samples_per_packet(sample_rate_hz)
        .map(|n| n as f64)
        .or_else(|| {
            analysis
                .timesync_data()
                .first()
                .map(|d| d.packet_duration / MICROS_PER_SECOND * sample_rate_hz)
        })
        .unwrap_or(0.0)
}

/// Add the packet's best offset to every timestamp (seconds)
pub fn update_time_array(data: &TimeSyncData, time_array: &[f64]) -> Vec<f64> {
    let offset_s = data.offset_correction() / MICROS_PER_SECOND;
    time_array.iter().map(|t| t + offset_s).collect()
}

/// Add the station's best offset to every timestamp (seconds)
///
/// # Errors
/// The analysis has no packets.
pub fn update_time_array_from_analysis(
    analysis: &TimeSyncAnalysis,
    time_array: &[f64],
) -> Result<Vec<f64>, ContractError> {
    let offset_s = analysis.best_offset()?.unwrap_or(0.0) / MICROS_PER_SECOND;
    Ok(time_array.iter().map(|t| t + offset_s).collect())
}
