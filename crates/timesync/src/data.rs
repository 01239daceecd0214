//! Per-packet time sync data.

use contracts::{DataPacket, StationId, StationMetadata, TimeSyncExchange};

use crate::packet_duration::packet_duration_us;
use crate::tri_message::TriMessageStats;

/// Time sync information about a single packet
///
/// All timestamps in microseconds. Statistics are `None` when the packet
/// carried no exchanges.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSyncData {
    pub station_id: StationId,
    pub sample_rate_hz: f64,
    pub station_start_timestamp: f64,

    /// When the packet arrived at the server
    pub server_acquisition_time: f64,
    pub packet_start_time: f64,
    pub packet_end_time: f64,

    /// Nominal duration from the sample rate
    pub packet_duration: f64,

    pub exchanges: Vec<TimeSyncExchange>,
    pub tri_message_stats: TriMessageStats,

    pub best_latency: Option<f64>,
    pub best_offset: Option<f64>,
    pub mean_latency: Option<f64>,
    pub latency_std: Option<f64>,
    pub mean_offset: Option<f64>,
    pub offset_std: Option<f64>,

    /// Index of the best exchange inside this packet
    pub best_tri_msg_index: Option<usize>,

    /// `server_acquisition_time - (packet_end_time + best_offset)`
    pub acquire_travel_time: f64,
}

impl TimeSyncData {
    /// Extract time sync data from one packet of a station
    ///
    /// A non-zero best latency/offset already present on the packet wins over
    /// the values computed from the exchanges.
    pub fn new(packet: &DataPacket, metadata: &StationMetadata) -> Self {
        let station_id = metadata.station_id.clone();
        let sample_rate_hz = metadata.timing.audio_sample_rate_hz;
        let tri_message_stats = TriMessageStats::new(station_id.clone(), &packet.timesync);

        let explicit_latency = packet.explicit_best_latency();
        let explicit_offset = packet.explicit_best_offset();

        let mut data = Self {
            station_id,
            sample_rate_hz,
            station_start_timestamp: metadata.timing.station_start_timestamp,
            server_acquisition_time: packet.server_timestamp,
            packet_start_time: packet.packet_start_timestamp,
            packet_end_time: packet.packet_end_timestamp,
            packet_duration: packet_duration_us(sample_rate_hz, packet.num_audio_samples),
            exchanges: packet.timesync.clone(),
            tri_message_stats,
            best_latency: explicit_latency,
            best_offset: explicit_offset,
            mean_latency: None,
            latency_std: None,
            mean_offset: None,
            offset_std: None,
            best_tri_msg_index: None,
            acquire_travel_time: 0.0,
        };
        data.compute_tri_message_stats(explicit_latency, explicit_offset);
        data.check_packet_duration();
        data.acquire_travel_time =
            data.server_acquisition_time - (data.packet_end_time + data.offset_correction());
        data
    }

    fn compute_tri_message_stats(
        &mut self,
        explicit_latency: Option<f64>,
        explicit_offset: Option<f64>,
    ) {
        if self.num_tri_messages() == 0 {
            if explicit_latency.is_none() {
                tracing::warn!(
                    station_id = %self.station_id,
                    packet_start = self.packet_start_time,
                    "packet has no time sync exchanges, no correction available"
                );
            }
            return;
        }

        let stats = &self.tri_message_stats;
        let latencies: Vec<f64> = stats.all_latencies().collect();
        let offsets: Vec<f64> = stats.all_offsets().collect();
        let (mean_latency, latency_std) = mean_and_std(&latencies);
        let (mean_offset, offset_std) = mean_and_std(&offsets);
        self.mean_latency = mean_latency;
        self.latency_std = latency_std;
        self.mean_offset = mean_offset;
        self.offset_std = offset_std;
        self.best_tri_msg_index = stats.best_latency_index();

        match explicit_latency {
            None => {
                self.best_latency = stats.best_latency();
                self.best_offset = stats.best_offset();
            }
            Some(_) if explicit_offset.is_none() => {
                self.best_offset = stats.best_offset();
            }
            Some(_) => {}
        }
    }

    fn check_packet_duration(&self) {
        let measured = self.packet_end_time - self.packet_start_time;
        let tolerance = if self.sample_rate_hz > 0.0 {
            contracts::MICROS_PER_SECOND / self.sample_rate_hz
        } else {
            0.0
        };
        if (measured - self.packet_duration).abs() > tolerance {
            tracing::debug!(
                station_id = %self.station_id,
                nominal = self.packet_duration,
                measured,
                "packet duration differs from nominal duration"
            );
        }
    }

    /// Number of exchanges in the packet
    #[inline]
    pub fn num_tri_messages(&self) -> usize {
        self.tri_message_stats.num_tri_messages()
    }

    /// Offset to add to station timestamps (0 if unknown)
    #[inline]
    pub fn offset_correction(&self) -> f64 {
        self.best_offset.unwrap_or(0.0)
    }

    /// True if the best latency is a usable value
    pub fn has_valid_latency(&self) -> bool {
        is_valid_latency(self.best_latency)
    }
}

/// Finite and non-negative
pub(crate) fn is_valid_latency(latency: Option<f64>) -> bool {
    latency.map_or(false, |l| l.is_finite() && l >= 0.0)
}

/// Mean and population std dev; NaN inputs propagate
fn mean_and_std(values: &[f64]) -> (Option<f64>, Option<f64>) {
    if values.is_empty() {
        return (None, None);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (Some(mean), Some(variance.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::StationTiming;

    fn metadata(sample_rate_hz: f64) -> StationMetadata {
        StationMetadata {
            station_id: "1637610021".into(),
            station_uuid: "uuid".into(),
            make: String::new(),
            model: String::new(),
            timing: StationTiming {
                station_start_timestamp: 1.0e15,
                audio_sample_rate_hz: sample_rate_hz,
                station_first_data_timestamp: None,
                episode_start_timestamp: None,
                episode_end_timestamp: None,
            },
        }
    }

    fn exchange(start: f64, d: f64, offset: f64) -> TimeSyncExchange {
        let b1 = start + d - offset;
        let b2 = b1 + 50.0;
        let a2 = b2 + offset + d;
        let a3 = a2 + 50.0;
        TimeSyncExchange {
            a1: start,
            a2,
            a3,
            b1,
            b2,
            b3: a3 + d - offset,
        }
    }

    fn packet(exchanges: Vec<TimeSyncExchange>) -> DataPacket {
        DataPacket {
            server_timestamp: 1.0e15 + 52_000_000.0,
            packet_start_timestamp: 1.0e15,
            packet_end_timestamp: 1.0e15 + 51_200_000.0,
            num_audio_samples: 4096,
            timesync: exchanges,
            best_latency: None,
            best_offset: None,
        }
    }

    #[test]
    fn test_computed_best_values() {
        let p = packet(vec![
            exchange(1.0e15, 2_000.0, 500.0),
            exchange(1.0e15 + 1.0e6, 1_000.0, 700.0),
        ]);
        let data = TimeSyncData::new(&p, &metadata(80.0));

        assert_eq!(data.num_tri_messages(), 2);
        assert_eq!(data.best_tri_msg_index, Some(1));
        assert!((data.best_latency.unwrap() - 1_000.0).abs() < 1e-6);
        assert!((data.best_offset.unwrap() - 700.0).abs() < 1e-6);
        assert!((data.mean_latency.unwrap() - 1_500.0).abs() < 1e-6);
        assert!((data.latency_std.unwrap() - 500.0).abs() < 1e-6);
        assert!((data.mean_offset.unwrap() - 600.0).abs() < 1e-6);
        assert_eq!(data.packet_duration, 51_200_000.0);
        assert!((data.acquire_travel_time - (800_000.0 - 700.0)).abs() < 1e-6);
    }

    #[test]
    fn test_zero_exchanges() {
        let data = TimeSyncData::new(&packet(Vec::new()), &metadata(80.0));
        assert_eq!(data.best_latency, None);
        assert_eq!(data.best_offset, None);
        assert_eq!(data.offset_correction(), 0.0);
        assert_eq!(data.mean_latency, None);
        assert_eq!(data.best_tri_msg_index, None);
        assert!(!data.has_valid_latency());
        assert_eq!(data.acquire_travel_time, 800_000.0);
    }

    #[test]
    fn test_explicit_values_win() {
        let mut p = packet(vec![exchange(1.0e15, 1_000.0, 700.0)]);
        p.best_latency = Some(1_234.0);
        p.best_offset = Some(-99.0);
        let data = TimeSyncData::new(&p, &metadata(80.0));
        assert_eq!(data.best_latency, Some(1_234.0));
        assert_eq!(data.best_offset, Some(-99.0));
        // statistics still come from the exchanges
        assert!((data.mean_latency.unwrap() - 1_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_explicit_latency_with_default_offset() {
        let mut p = packet(vec![exchange(1.0e15, 1_000.0, 700.0)]);
        p.best_latency = Some(1_234.0);
        p.best_offset = Some(0.0);
        let data = TimeSyncData::new(&p, &metadata(80.0));
        assert_eq!(data.best_latency, Some(1_234.0));
        assert!((data.best_offset.unwrap() - 700.0).abs() < 1e-6);
    }

    #[test]
    fn test_explicit_values_survive_without_exchanges() {
        let mut p = packet(Vec::new());
        p.best_latency = Some(1_500.0);
        p.best_offset = Some(250.0);
        let data = TimeSyncData::new(&p, &metadata(80.0));
        assert_eq!(data.best_latency, Some(1_500.0));
        assert_eq!(data.offset_correction(), 250.0);
    }

    #[test]
    fn test_unknown_rate_duration_from_samples() {
        let mut p = packet(Vec::new());
        p.num_audio_samples = 250;
        let data = TimeSyncData::new(&p, &metadata(100.0));
        assert_eq!(data.packet_duration, 2_500_000.0);
    }
}
