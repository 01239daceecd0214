//! Per-station window summaries
//!
//! Plain data emitted by the window builder and consumed by observability and
//! the CLI.

use serde::{Deserialize, Serialize};

use crate::{SensorType, StationId};

/// What happened to one sensor inside the window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorWindowSummary {
    pub sensor_type: SensorType,

    /// Rows after truncation, gap filling and padding
    pub rows: usize,

    /// Rows synthesized inside the data
    pub gap_rows: usize,

    /// Rows synthesized at the window edges
    pub pad_rows: usize,
}

/// What happened to one station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationWindowSummary {
    pub station_id: StationId,

    /// False if the station was dropped
    pub retained: bool,

    /// Window bounds applied (microseconds)
    pub window_start_us: Option<f64>,
    pub window_end_us: Option<f64>,

    /// Best latency from the time-sync analysis (microseconds)
    pub best_latency_us: Option<f64>,

    /// Best offset from the time-sync analysis (microseconds)
    pub best_offset_us: Option<f64>,

    /// True if the offset was added to the timestamps
    pub corrected: bool,

    pub bad_packets: usize,
    pub packets_kept: usize,

    #[serde(default)]
    pub sensors: Vec<SensorWindowSummary>,
}

impl StationWindowSummary {
    /// Summary for a station that did not make it into the window
    pub fn dropped(station_id: StationId) -> Self {
        Self {
            station_id,
            retained: false,
            window_start_us: None,
            window_end_us: None,
            best_latency_us: None,
            best_offset_us: None,
            corrected: false,
            bad_packets: 0,
            packets_kept: 0,
            sensors: Vec::new(),
        }
    }

    /// Synthesized rows across all sensors
    pub fn synthesized_rows(&self) -> usize {
        self.sensors.iter().map(|s| s.gap_rows + s.pad_rows).sum()
    }
}
