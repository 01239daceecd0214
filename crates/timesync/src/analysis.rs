//! Station-level time sync analysis.

use contracts::{ContractError, Station, StationId};
use tracing::instrument;

use crate::data::{is_valid_latency, TimeSyncData};
use crate::stats::StatsContainer;

/// Aggregates the [`TimeSyncData`] of every packet of one station
///
/// Packets are kept in insertion order. The best packet is the one with the
/// smallest valid best latency; index 0 is the starting candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSyncAnalysis {
    station_id: StationId,
    best_latency_index: usize,
    latency_stats: StatsContainer,
    offset_stats: StatsContainer,
    station_start_timestamp: Option<f64>,
    sample_rate_hz: Option<f64>,
    /// Cleared once a packet disagrees with the first one
    start_timestamp_consistent: bool,
    sample_rate_consistent: bool,
    timesync_data: Vec<TimeSyncData>,
}

impl TimeSyncAnalysis {
    /// Empty analysis for `station_id`
    pub fn new(station_id: impl Into<StationId>) -> Self {
        Self {
            station_id: station_id.into(),
            best_latency_index: 0,
            latency_stats: StatsContainer::new("latency"),
            offset_stats: StatsContainer::new("offset"),
            station_start_timestamp: None,
            sample_rate_hz: None,
            start_timestamp_consistent: true,
            sample_rate_consistent: true,
            timesync_data: Vec::new(),
        }
    }

    /// Analyse every packet of a station
    ///
    /// # Errors
    /// The station has no packets.
    #[instrument(name = "timesync_from_station", skip(station), fields(station_id = %station.id()))]
    pub fn from_station(station: &Station) -> Result<Self, ContractError> {
        if station.packets.is_empty() {
            return Err(ContractError::empty_analysis(station.id().clone()));
        }
        let mut analysis = Self::new(station.id().clone());
        analysis.timesync_data = station
            .packets
            .iter()
            .map(|packet| TimeSyncData::new(packet, &station.metadata))
            .collect();
        analysis.evaluate_and_validate();
        analysis.record_metrics();
        Ok(analysis)
    }

    /// Append one packet and re-evaluate
    pub fn add(&mut self, data: TimeSyncData) {
        self.timesync_data.push(data);
        self.evaluate_and_validate();
    }

    fn evaluate_and_validate(&mut self) {
        self.calc_timesync_stats();
        if self.evaluate_latencies().is_err() {
            return;
        }
        if let Some(first) = self.timesync_data.first() {
            self.station_start_timestamp = Some(first.station_start_timestamp);
            self.sample_rate_hz = Some(first.sample_rate_hz);
        }

        // a flag only ever flips once, so each drift is reported once
        if self.start_timestamp_consistent {
            if let Some((expected, read)) = self.start_timestamp_mismatch() {
                self.start_timestamp_consistent = false;
                tracing::warn!(
                    station_id = %self.station_id,
                    expected,
                    read,
                    "change in station start timestamp detected"
                );
            }
        }
        if self.sample_rate_consistent {
            if let Some((expected, read)) = self.sample_rate_mismatch() {
                self.sample_rate_consistent = false;
                tracing::warn!(
                    station_id = %self.station_id,
                    expected,
                    read,
                    "change in station sample rate detected"
                );
            }
        }
    }

    fn start_timestamp_mismatch(&self) -> Option<(f64, f64)> {
        let (first, rest) = self.timesync_data.split_first()?;
        rest.iter()
            .map(|d| d.station_start_timestamp)
            .find(|read| *read != first.station_start_timestamp)
            .map(|read| (first.station_start_timestamp, read))
    }

    fn sample_rate_mismatch(&self) -> Option<(f64, f64)> {
        let (first, rest) = self.timesync_data.split_first()?;
        rest.iter()
            .map(|d| d.sample_rate_hz)
            .find(|read| *read != first.sample_rate_hz)
            .map(|read| (first.sample_rate_hz, read))
    }

    fn calc_timesync_stats(&mut self) {
        self.latency_stats = StatsContainer::new("latency");
        self.offset_stats = StatsContainer::new("offset");
        for data in &self.timesync_data {
            let count = data.num_tri_messages() * 2;
            self.latency_stats
                .add(data.mean_latency, data.latency_std, count);
            self.offset_stats.add(data.mean_offset, data.offset_std, count);
        }
    }

    fn record_metrics(&self) {
        let station = self.station_id.to_string();
        metrics::counter!("timesync_packets_total", "station_id" => station.clone())
            .increment(self.num_packets() as u64);
        metrics::counter!("timesync_bad_packets_total", "station_id" => station.clone())
            .increment(self.bad_packets().len() as u64);
        if let Ok(Some(latency)) = self.best_latency() {
            metrics::gauge!("timesync_best_latency_us", "station_id" => station.clone())
                .set(latency);
        }
        if let Ok(Some(offset)) = self.best_offset() {
            metrics::gauge!("timesync_best_offset_us", "station_id" => station).set(offset);
        }
    }

    fn ensure_not_empty(&self) -> Result<(), ContractError> {
        if self.timesync_data.is_empty() {
            return Err(ContractError::empty_analysis(self.station_id.clone()));
        }
        Ok(())
    }

    fn best_data(&self) -> Result<&TimeSyncData, ContractError> {
        self.timesync_data
            .get(self.best_latency_index)
            .ok_or_else(|| ContractError::empty_analysis(self.station_id.clone()))
    }

    /// Rescan all packets for the smallest valid best latency
    ///
    /// A candidate replaces the current best if it is valid and either the
    /// current best is not, or the candidate is strictly smaller.
    pub fn evaluate_latencies(&mut self) -> Result<(), ContractError> {
        self.ensure_not_empty()?;
        self.best_latency_index = 0;
        for index in 1..self.timesync_data.len() {
            let candidate = self.timesync_data[index].best_latency;
            if !is_valid_latency(candidate) {
                continue;
            }
            let current = self.timesync_data[self.best_latency_index].best_latency;
            let better = match (candidate, current) {
                (Some(c), Some(b)) if is_valid_latency(current) => c < b,
                _ => true,
            };
            if better {
                self.best_latency_index = index;
            }
        }
        Ok(())
    }

    /// True if every packet reports the first packet's station start timestamp
    ///
    /// Logs a warning on mismatch.
    pub fn validate_start_timestamp(&self) -> Result<bool, ContractError> {
        self.ensure_not_empty()?;
        match self.start_timestamp_mismatch() {
            Some((expected, read)) => {
                tracing::warn!(
                    station_id = %self.station_id,
                    expected,
                    read,
                    "change in station start timestamp detected"
                );
                Ok(false)
            }
            None => Ok(true),
        }
    }

    /// True if every packet reports the first packet's sample rate
    ///
    /// Logs a warning on mismatch.
    pub fn validate_sample_rate(&self) -> Result<bool, ContractError> {
        self.ensure_not_empty()?;
        match self.sample_rate_mismatch() {
            Some((expected, read)) => {
                tracing::warn!(
                    station_id = %self.station_id,
                    expected,
                    read,
                    "change in station sample rate detected"
                );
                Ok(false)
            }
            None => Ok(true),
        }
    }

    /// Start timestamp check of the last evaluation, without logging
    pub fn is_start_timestamp_consistent(&self) -> bool {
        self.start_timestamp_consistent
    }

    /// Sample rate check of the last evaluation, without logging
    pub fn is_sample_rate_consistent(&self) -> bool {
        self.sample_rate_consistent
    }

    pub fn station_id(&self) -> &StationId {
        &self.station_id
    }

    pub fn timesync_data(&self) -> &[TimeSyncData] {
        &self.timesync_data
    }

    #[inline]
    pub fn num_packets(&self) -> usize {
        self.timesync_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timesync_data.is_empty()
    }

    /// Index of the best packet
    pub fn best_latency_index(&self) -> usize {
        self.best_latency_index
    }

    /// First packet's station start timestamp
    pub fn station_start_timestamp(&self) -> Option<f64> {
        self.station_start_timestamp
    }

    /// First packet's sample rate
    pub fn sample_rate_hz(&self) -> Option<f64> {
        self.sample_rate_hz
    }

    pub fn best_latency(&self) -> Result<Option<f64>, ContractError> {
        Ok(self.best_data()?.best_latency)
    }

    pub fn best_offset(&self) -> Result<Option<f64>, ContractError> {
        Ok(self.best_data()?.best_offset)
    }

    /// Offset to add to station timestamps; 0 when nothing is known
    pub fn offset_correction(&self) -> f64 {
        self.best_data()
            .map(TimeSyncData::offset_correction)
            .unwrap_or(0.0)
    }

    /// Start time of the best packet
    pub fn best_start_time(&self) -> Result<f64, ContractError> {
        Ok(self.best_data()?.packet_start_time)
    }

    /// Exchange index inside the best packet
    pub fn best_packet_latency_index(&self) -> Result<Option<usize>, ContractError> {
        Ok(self.best_data()?.best_tri_msg_index)
    }

    /// Best latency of every packet
    pub fn latencies(&self) -> Vec<Option<f64>> {
        self.timesync_data.iter().map(|d| d.best_latency).collect()
    }

    /// Best offset of every packet
    pub fn offsets(&self) -> Vec<Option<f64>> {
        self.timesync_data.iter().map(|d| d.best_offset).collect()
    }

    /// Start time of every packet
    pub fn start_times(&self) -> Vec<f64> {
        self.timesync_data
            .iter()
            .map(|d| d.packet_start_time)
            .collect()
    }

    pub fn mean_latency(&self) -> Option<f64> {
        self.latency_stats.mean_of_means()
    }

    pub fn latency_std(&self) -> Option<f64> {
        self.latency_stats.total_std_dev()
    }

    pub fn mean_offset(&self) -> Option<f64> {
        self.offset_stats.mean_of_means()
    }

    pub fn offset_std(&self) -> Option<f64> {
        self.offset_stats.total_std_dev()
    }

    /// Packets whose latency is missing, NaN or not positive
    pub fn bad_packets(&self) -> Vec<usize> {
        self.timesync_data
            .iter()
            .enumerate()
            .filter(|(_, d)| d.best_latency.map_or(true, |l| l.is_nan() || l <= 0.0))
            .map(|(index, _)| index)
            .collect()
    }
}
