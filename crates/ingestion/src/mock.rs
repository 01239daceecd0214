//! Mock station source
//!
//! Builds synthetic stations in memory for tests and demos. The station clock
//! runs `clock_offset_us` behind the server clock and every message takes
//! `latency_us` to cross the network.

use std::collections::{BTreeMap, BTreeSet};

use contracts::{
    ContractError, DataPacket, ReadRequest, SensorData, SensorTable, SensorType, Station,
    StationMetadata, StationSource, StationTiming, TimeSyncExchange, MICROS_PER_SECOND,
};
use tracing::debug;

use crate::filter::restrict_to_request;

/// Station processing time between receiving and answering an exchange
const TURNAROUND_US: f64 = 50.0;

/// Mock station configuration
#[derive(Debug, Clone)]
pub struct MockStationConfig {
    pub station_id: String,

    /// First audio sample (station clock, microseconds)
    pub start_timestamp_us: f64,

    pub sample_rate_hz: f64,

    pub num_packets: usize,

    /// Audio samples per packet
    pub samples_per_packet: usize,

    /// Server clock minus station clock (microseconds)
    pub clock_offset_us: f64,

    /// One-way network delay (microseconds)
    pub latency_us: f64,

    /// One-way delay overrides per packet index
    pub packet_latencies_us: BTreeMap<usize, f64>,

    /// Exchanges recorded per packet
    pub exchanges_per_packet: usize,

    /// Packets that carry no exchanges at all
    pub empty_exchange_packets: BTreeSet<usize>,

    /// Packets that never reached the server (no packet, no audio)
    pub missing_packets: BTreeSet<usize>,

    /// Optional barometer rate (Hz), sampled unevenly
    pub barometer_rate_hz: Option<f64>,
}

impl Default for MockStationConfig {
    fn default() -> Self {
        Self {
            station_id: "1637610021".to_string(),
            start_timestamp_us: 1_637_604_000.0 * MICROS_PER_SECOND,
            sample_rate_hz: 80.0,
            num_packets: 10,
            samples_per_packet: 4096,
            clock_offset_us: 0.0,
            latency_us: 1_000.0,
            packet_latencies_us: BTreeMap::new(),
            exchanges_per_packet: 3,
            empty_exchange_packets: BTreeSet::new(),
            missing_packets: BTreeSet::new(),
            barometer_rate_hz: None,
        }
    }
}

impl MockStationConfig {
    /// Station with `num_packets` one-second packets at `sample_rate_hz`
    pub fn new(station_id: &str, sample_rate_hz: f64, num_packets: usize) -> Self {
        Self {
            station_id: station_id.to_string(),
            sample_rate_hz,
            num_packets,
            samples_per_packet: sample_rate_hz.round() as usize,
            ..Default::default()
        }
    }

    pub fn with_start(mut self, start_timestamp_us: f64) -> Self {
        self.start_timestamp_us = start_timestamp_us;
        self
    }

    pub fn with_clock(mut self, clock_offset_us: f64, latency_us: f64) -> Self {
        self.clock_offset_us = clock_offset_us;
        self.latency_us = latency_us;
        self
    }

    pub fn with_packet_latency(mut self, packet: usize, latency_us: f64) -> Self {
        self.packet_latencies_us.insert(packet, latency_us);
        self
    }

    pub fn with_empty_exchanges(mut self, packet: usize) -> Self {
        self.empty_exchange_packets.insert(packet);
        self
    }

    pub fn with_missing_packet(mut self, packet: usize) -> Self {
        self.missing_packets.insert(packet);
        self
    }

    pub fn with_barometer(mut self, rate_hz: f64) -> Self {
        self.barometer_rate_hz = Some(rate_hz);
        self
    }

    fn packet_duration_us(&self) -> f64 {
        self.samples_per_packet as f64 / self.sample_rate_hz * MICROS_PER_SECOND
    }

    fn latency_for(&self, packet: usize) -> f64 {
        self.packet_latencies_us
            .get(&packet)
            .copied()
            .unwrap_or(self.latency_us)
    }

    /// Exchange sent by the server at `server_send` with one-way delay `latency`
    fn exchange(&self, server_send: f64, latency: f64) -> TimeSyncExchange {
        let to_station = |server: f64| server - self.clock_offset_us;
        let a1 = server_send;
        let b1 = to_station(a1 + latency);
        let b2 = b1 + TURNAROUND_US;
        let a2 = b2 + self.clock_offset_us + latency;
        let a3 = a2 + TURNAROUND_US;
        let b3 = to_station(a3 + latency);
        TimeSyncExchange {
            a1,
            a2,
            a3,
            b1,
            b2,
            b3,
        }
    }

    /// Generate the station
    pub fn build(&self) -> Station {
        let mut station = Station::new(StationMetadata {
            station_id: self.station_id.as_str().into(),
            station_uuid: format!("mock-{}", self.station_id),
            make: "mock".to_string(),
            model: "synthetic".to_string(),
            timing: StationTiming {
                station_start_timestamp: self.start_timestamp_us,
                audio_sample_rate_hz: self.sample_rate_hz,
                station_first_data_timestamp: None,
                episode_start_timestamp: None,
                episode_end_timestamp: None,
            },
        });

        let interval_us = MICROS_PER_SECOND / self.sample_rate_hz;
        let duration_us = self.packet_duration_us();
        let mut timestamps = Vec::new();
        let mut values = Vec::new();

        for p in (0..self.num_packets).filter(|p| !self.missing_packets.contains(p)) {
            let packet_start = self.start_timestamp_us + p as f64 * duration_us;
            let packet_end = packet_start + duration_us;
            let latency = self.latency_for(p);
            let server_end = packet_end + self.clock_offset_us;

            let timesync = if self.empty_exchange_packets.contains(&p) {
                Vec::new()
            } else {
                let spacing = duration_us / (self.exchanges_per_packet + 1) as f64;
                (0..self.exchanges_per_packet)
                    .map(|k| {
                        let server_send =
                            packet_start + self.clock_offset_us + (k + 1) as f64 * spacing;
                        self.exchange(server_send, latency)
                    })
                    .collect()
            };

            station.packets.push(DataPacket {
                server_timestamp: server_end + latency,
                packet_start_timestamp: packet_start,
                packet_end_timestamp: packet_end,
                num_audio_samples: self.samples_per_packet,
                timesync,
                best_latency: None,
                best_offset: None,
            });

            let first_sample = p * self.samples_per_packet;
            for i in first_sample..first_sample + self.samples_per_packet {
                timestamps.push(self.start_timestamp_us + i as f64 * interval_us);
                values.push((i as f64 * 0.05).sin());
            }
        }

        if !timestamps.is_empty() {
            if let Ok(table) = SensorTable::new(timestamps).with_column("microphone", values) {
                station.insert_sensor(SensorData::fixed_rate(
                    "mock microphone",
                    SensorType::Audio,
                    table,
                    self.sample_rate_hz,
                ));
            }
        }
        if let Some(rate_hz) = self.barometer_rate_hz {
            if let Some(barometer) = self.barometer(rate_hz) {
                station.insert_sensor(barometer);
            }
        }

        debug!(
            station_id = %self.station_id,
            packets = station.packets.len(),
            "mock station built"
        );
        station
    }

    /// Pressure samples with a small deterministic jitter, skipping missing packets
    fn barometer(&self, rate_hz: f64) -> Option<SensorData> {
        let duration_us = self.packet_duration_us();
        let interval_us = MICROS_PER_SECOND / rate_hz;
        let total = (self.num_packets as f64 * duration_us / interval_us) as usize;
        let (timestamps, values): (Vec<f64>, Vec<f64>) = (0..total)
            .map(|i| {
                let jitter = ((i % 5) as f64 - 2.0) * interval_us * 0.01;
                (self.start_timestamp_us + i as f64 * interval_us + jitter, i)
            })
            .filter(|(t, _)| {
                let packet = ((t - self.start_timestamp_us) / duration_us) as usize;
                !self.missing_packets.contains(&packet)
            })
            .map(|(t, i)| (t, 101.3 + (i as f64 * 0.1).cos() * 0.01))
            .unzip();
        if timestamps.len() < 2 {
            return None;
        }
        let table = SensorTable::new(timestamps)
            .with_column("pressure", values)
            .ok()?;
        Some(SensorData::unevenly_sampled(
            "mock barometer",
            SensorType::Pressure,
            table,
        ))
    }
}

/// In-memory station source
#[derive(Debug, Clone, Default)]
pub struct MockStationSource {
    stations: Vec<MockStationConfig>,
}

impl MockStationSource {
    pub fn new(stations: Vec<MockStationConfig>) -> Self {
        Self { stations }
    }

    /// Add another station
    pub fn with_station(mut self, station: MockStationConfig) -> Self {
        self.stations.push(station);
        self
    }
}

impl StationSource for MockStationSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn read_stations(&self, request: &ReadRequest) -> Result<Vec<Station>, ContractError> {
        let stations: Vec<Station> = self
            .stations
            .iter()
            .filter(|config| request.wants_station(&config.station_id))
            .filter_map(|config| restrict_to_request(config.build(), request))
            .collect();
        metrics::counter!("ingestion_stations_loaded_total", "source" => "mock")
            .increment(stations.len() as u64);
        Ok(stations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request() -> ReadRequest {
        ReadRequest {
            input_directory: PathBuf::from("/mock"),
            station_ids: None,
            start_timestamp_us: None,
            end_timestamp_us: None,
            structured_layout: true,
        }
    }

    #[test]
    fn test_mock_station_shape() {
        let station = MockStationConfig::new("100", 100.0, 3).build();
        assert_eq!(station.packets.len(), 3);
        assert_eq!(station.packets[0].timesync.len(), 3);
        let audio = station.audio_sensor().unwrap();
        assert_eq!(audio.num_samples(), 300);
        assert_eq!(
            audio.first_data_timestamp(),
            Some(station.metadata.timing.station_start_timestamp)
        );
    }

    #[test]
    fn test_exchange_encodes_clock() {
        let config = MockStationConfig::new("100", 100.0, 1).with_clock(2_500.0, 400.0);
        let e = config.build().packets[0].timesync[0];

        let latency1 = ((e.a2 - e.a1) - (e.b2 - e.b1)) / 2.0;
        let latency3 = ((e.b3 - e.b2) - (e.a3 - e.a2)) / 2.0;
        let offset1 = ((e.a1 - e.b1) + (e.a2 - e.b2)) / 2.0;
        assert!((latency1 - 400.0).abs() < 1e-6);
        assert!((latency3 - 400.0).abs() < 1e-6);
        assert!((offset1 - 2_500.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_packets_leave_gap() {
        let station = MockStationConfig::new("100", 100.0, 4)
            .with_missing_packet(1)
            .with_empty_exchanges(2)
            .build();
        assert_eq!(station.packets.len(), 3);
        assert!(station.packets[1].timesync.is_empty());
        assert_eq!(station.audio_sensor().unwrap().num_samples(), 300);
    }

    #[test]
    fn test_barometer_is_unevenly_sampled() {
        let station = MockStationConfig::new("100", 100.0, 2)
            .with_barometer(10.0)
            .build();
        let barometer = station.sensor(SensorType::Pressure).unwrap();
        assert!(!barometer.is_sample_rate_fixed);
        assert!((barometer.sample_interval_s - 0.1).abs() < 0.01);
        assert_eq!(barometer.num_samples(), 20);
    }

    #[test]
    fn test_source_applies_request() {
        let source = MockStationSource::new(vec![
            MockStationConfig::new("100", 100.0, 10).with_start(0.0),
            MockStationConfig::new("200", 100.0, 10).with_start(0.0),
        ]);

        let mut request = request();
        request.station_ids = Some(["200".into()].into_iter().collect());
        request.start_timestamp_us = Some(2.0e6);
        request.end_timestamp_us = Some(4.0e6);

        let stations = source.read_stations(&request).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].id().as_str(), "200");
        // packets ending at 2 s through starting at 4 s
        assert_eq!(stations[0].packets.len(), 4);
        let audio = stations[0].audio_sensor().unwrap();
        assert_eq!(audio.first_data_timestamp(), Some(2.0e6));
        assert_eq!(audio.last_data_timestamp(), Some(4.0e6));
    }

    #[test]
    fn test_source_out_of_range_is_empty() {
        let source = MockStationSource::default()
            .with_station(MockStationConfig::new("100", 100.0, 2).with_start(0.0));
        let mut request = request();
        request.start_timestamp_us = Some(1.0e9);
        assert!(source.read_stations(&request).unwrap().is_empty());
    }
}
