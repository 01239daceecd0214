//! Station - packets plus per-sensor time series for one station
//!
//! Produced by a [`StationSource`](crate::StationSource), owned afterwards by
//! exactly one data window.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{DataPacket, SensorData, SensorType, StationId};

/// Station timing block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationTiming {
    /// When the station app started (station clock, microseconds)
    pub station_start_timestamp: f64,

    /// Nominal audio sample rate (Hz)
    pub audio_sample_rate_hz: f64,

    /// First audio timestamp after windowing
    #[serde(default)]
    pub station_first_data_timestamp: Option<f64>,

    /// Window start applied to this station
    #[serde(default)]
    pub episode_start_timestamp: Option<f64>,

    /// Window end applied to this station
    #[serde(default)]
    pub episode_end_timestamp: Option<f64>,
}

/// Metadata shared by every packet of a station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMetadata {
    pub station_id: StationId,

    #[serde(default)]
    pub station_uuid: String,

    #[serde(default)]
    pub make: String,

    #[serde(default)]
    pub model: String,

    pub timing: StationTiming,
}

/// One station's data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub metadata: StationMetadata,

    /// Packets in acquisition order
    #[serde(default)]
    pub packets: Vec<DataPacket>,

    /// Time series per sensor kind
    #[serde(default)]
    pub sensors: BTreeMap<SensorType, SensorData>,

    /// True once the best offset has been applied to the timestamps
    #[serde(default)]
    pub timestamps_corrected: bool,
}

impl Station {
    /// Create a station without packets or sensors
    pub fn new(metadata: StationMetadata) -> Self {
        Self {
            metadata,
            packets: Vec::new(),
            sensors: BTreeMap::new(),
            timestamps_corrected: false,
        }
    }

    /// Station identifier
    #[inline]
    pub fn id(&self) -> &StationId {
        &self.metadata.station_id
    }

    /// Insert or replace a sensor
    pub fn insert_sensor(&mut self, sensor: SensorData) {
        self.sensors.insert(sensor.sensor_type, sensor);
    }

    /// Sensor by kind
    pub fn sensor(&self, sensor_type: SensorType) -> Option<&SensorData> {
        self.sensors.get(&sensor_type)
    }

    /// Audio sensor, if present
    pub fn audio_sensor(&self) -> Option<&SensorData> {
        self.sensor(SensorType::Audio)
    }

    /// True if the station has at least one audio sample
    pub fn has_audio_data(&self) -> bool {
        self.audio_sensor()
            .map(|audio| !audio.data.is_empty())
            .unwrap_or(false)
    }

    /// First audio timestamp
    pub fn first_data_timestamp(&self) -> Option<f64> {
        self.audio_sensor().and_then(SensorData::first_data_timestamp)
    }

    /// Last audio timestamp
    pub fn last_data_timestamp(&self) -> Option<f64> {
        self.audio_sensor().and_then(SensorData::last_data_timestamp)
    }

    /// Order packets by start timestamp
    pub fn sort_packets(&mut self) {
        self.packets.sort_by(|a, b| {
            a.packet_start_timestamp
                .total_cmp(&b.packet_start_timestamp)
        });
    }
}
