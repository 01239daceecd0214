//! # Timesync
//!
//! Station clock reconciliation against the server clock.
//!
//! Responsibilities:
//! - Tri-message latency/offset estimation per packet
//! - Per-station aggregation and best packet selection
//! - Sample rate / start time consistency checks
//! - Time array correction
//!
//! ## Usage
//!
//! ```ignore
//! use timesync::{update_time_array_from_analysis, TimeSyncAnalysis};
//!
//! let analysis = TimeSyncAnalysis::from_station(&station)?;
//! let corrected = update_time_array_from_analysis(&analysis, &times_s)?;
//! ```

mod analysis;
mod correction;
mod data;
pub mod packet_duration;
mod stats;
mod tri_message;

pub use analysis::TimeSyncAnalysis;
pub use correction::{
    update_evenly_sampled_time_array, update_time_array, update_time_array_from_analysis,
    validate_sensors,
};
pub use data::TimeSyncData;
pub use stats::StatsContainer;
pub use tri_message::TriMessageStats;
