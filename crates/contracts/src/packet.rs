//! DataPacket - one bounded batch of station recordings
//!
//! All timestamps are microseconds since epoch.

use serde::{Deserialize, Serialize};

/// One round-trip probe between the station and the reference server
///
/// `a*` are read on the server clock, `b*` on the station clock.
/// Message order: a1 → b1, b2 → a2, a3 → b3.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSyncExchange {
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
    pub b1: f64,
    pub b2: f64,
    pub b3: f64,
}

impl TimeSyncExchange {
    /// Build an exchange from `[a1, a2, a3, b1, b2, b3]`
    pub fn from_array(values: [f64; 6]) -> Self {
        let [a1, a2, a3, b1, b2, b3] = values;
        Self {
            a1,
            a2,
            a3,
            b1,
            b2,
            b3,
        }
    }
}

/// Packet-level timing information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPacket {
    /// When the packet arrived at the server (server clock)
    pub server_timestamp: f64,

    /// First sample time (station clock)
    pub packet_start_timestamp: f64,

    /// Last sample time (station clock)
    pub packet_end_timestamp: f64,

    /// Number of audio samples in the packet
    #[serde(default)]
    pub num_audio_samples: usize,

    /// Round-trip exchanges recorded while the packet was built
    #[serde(default)]
    pub timesync: Vec<TimeSyncExchange>,

    /// Best latency computed by the station, if it sent one
    #[serde(default)]
    pub best_latency: Option<f64>,

    /// Best offset computed by the station, if it sent one
    #[serde(default)]
    pub best_offset: Option<f64>,
}

impl DataPacket {
    /// Explicit best latency, ignoring the zero default
    pub fn explicit_best_latency(&self) -> Option<f64> {
        self.best_latency.filter(|l| *l != 0.0)
    }

    /// Explicit best offset, ignoring the zero default
    pub fn explicit_best_offset(&self) -> Option<f64> {
        self.best_offset.filter(|o| *o != 0.0)
    }

    /// True if the packet's data overlaps the open interval `(start, end)`
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.packet_end_timestamp > start && self.packet_start_timestamp < end
    }

    /// Shift every station-clock timestamp by `offset_us`
    pub fn shift_timestamps(&mut self, offset_us: f64) {
        self.packet_start_timestamp += offset_us;
        self.packet_end_timestamp += offset_us;
    }
}
