//! StationSource trait - station data source abstraction
//!
//! Decouples the window builder from how station files are found and parsed.
//! Mock and on-disk sources share the same API.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::{ContractError, Station, StationId};

/// What a source should load
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRequest {
    /// Root directory of the station files
    pub input_directory: PathBuf,

    /// Station filter (None = all)
    pub station_ids: Option<BTreeSet<StationId>>,

    /// Earliest packet end to load (microseconds)
    pub start_timestamp_us: Option<f64>,

    /// Latest packet start to load (microseconds)
    pub end_timestamp_us: Option<f64>,

    /// `<dir>/<station_id>/*.json` instead of `<dir>/*.json`
    pub structured_layout: bool,
}

impl ReadRequest {
    /// True if the station passes the id filter
    pub fn wants_station(&self, station_id: &str) -> bool {
        self.station_ids
            .as_ref()
            .map(|ids| ids.iter().any(|id| id == station_id))
            .unwrap_or(true)
    }

    /// True if a packet spanning `[start, end]` falls in the requested range
    pub fn wants_range(&self, start: f64, end: f64) -> bool {
        let after_start = self.start_timestamp_us.map_or(true, |s| end >= s);
        let before_end = self.end_timestamp_us.map_or(true, |e| start <= e);
        after_start && before_end
    }
}

/// Station data source trait
///
/// Sources return one merged [`Station`] per station id, packets in
/// acquisition order. Stations the filter asked for but which have no data are
/// simply absent from the result; the caller decides how to report them.
pub trait StationSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Load every station matching the request
    fn read_stations(&self, request: &ReadRequest) -> Result<Vec<Station>, ContractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ReadRequest {
        ReadRequest {
            input_directory: PathBuf::from("/data"),
            station_ids: None,
            start_timestamp_us: Some(100.0),
            end_timestamp_us: Some(200.0),
            structured_layout: false,
        }
    }

    #[test]
    fn test_range_is_inclusive() {
        let r = request();
        assert!(r.wants_range(50.0, 100.0));
        assert!(r.wants_range(200.0, 300.0));
        assert!(!r.wants_range(0.0, 99.0));
        assert!(!r.wants_range(201.0, 300.0));
    }

    #[test]
    fn test_open_range_accepts_everything() {
        let mut r = request();
        r.start_timestamp_us = None;
        r.end_timestamp_us = None;
        assert!(r.wants_range(-1.0e12, 1.0e12));
        assert!(r.wants_station("any"));
    }
}
