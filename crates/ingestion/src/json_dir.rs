//! Station files on disk
//!
//! Each `.json` file holds one serialized [`Station`], usually a slice of a
//! longer recording. Files sharing a station id are merged. Two layouts:
//! - structured: `<dir>/<station_id>/*.json`
//! - flat: `<dir>/*.json`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use contracts::{ContractError, ReadRequest, Station, StationId, StationSource};
use tracing::{debug, instrument, warn};

use crate::error::{IngestionError, Result};
use crate::filter::restrict_to_request;

/// Reads stations from JSON files under the request's input directory
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDirSource;

impl JsonDirSource {
    pub fn new() -> Self {
        Self
    }

    /// Write one station file, creating the station directory if needed
    ///
    /// The file is named after the first packet start time so that slices of
    /// the same station do not overwrite each other.
    pub fn write_station(root: &Path, station: &Station, structured: bool) -> Result<PathBuf> {
        let dir = if structured {
            root.join(station.id().as_str())
        } else {
            root.to_path_buf()
        };
        fs::create_dir_all(&dir).map_err(|source| IngestionError::File {
            path: dir.clone(),
            source,
        })?;

        let start = station
            .packets
            .first()
            .map(|p| p.packet_start_timestamp as i64)
            .unwrap_or_default();
        let path = dir.join(format!("{}_{start}.json", station.id()));
        let json = serde_json::to_vec_pretty(station).map_err(|source| {
            IngestionError::ParseFailed {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json).map_err(|source| IngestionError::File {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// `.json` files directly inside `dir`, sorted by name
    fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(dir).map_err(|source| IngestionError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json")
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Files to read for this request
    fn station_files(request: &ReadRequest) -> Result<Vec<PathBuf>> {
        let root = &request.input_directory;
        if !request.structured_layout {
            return Self::json_files(root);
        }

        let entries = fs::read_dir(root).map_err(|source| IngestionError::ReadDir {
            path: root.clone(),
            source,
        })?;
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| request.wants_station(name))
            })
            .collect();
        dirs.sort();

        let mut files = Vec::new();
        for dir in dirs {
            files.extend(Self::json_files(&dir)?);
        }
        Ok(files)
    }

    fn read_file(path: &Path) -> Result<Station> {
        let bytes = fs::read(path).map_err(|source| IngestionError::File {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| IngestionError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fold `other` into `station`
fn merge(station: &mut Station, other: Station) {
    if other.metadata.timing.audio_sample_rate_hz != station.metadata.timing.audio_sample_rate_hz
    {
        warn!(
            station_id = %station.id(),
            "audio sample rate differs between station files, keeping the first"
        );
    }
    station.packets.extend(other.packets);
    for (sensor_type, sensor) in other.sensors {
        match station.sensors.get_mut(&sensor_type) {
            Some(existing) => {
                existing.data.append(&sensor.data);
                existing.data = existing.data.sorted();
            }
            None => {
                station.sensors.insert(sensor_type, sensor);
            }
        }
    }
}

impl StationSource for JsonDirSource {
    fn name(&self) -> &str {
        "json_dir"
    }

    #[instrument(
        name = "json_dir_read_stations",
        skip(self, request),
        fields(dir = %request.input_directory.display())
    )]
    fn read_stations(&self, request: &ReadRequest) -> std::result::Result<Vec<Station>, ContractError> {
        let files = Self::station_files(request)?;
        debug!(files = files.len(), "station files found");

        let mut merged: BTreeMap<StationId, Station> = BTreeMap::new();
        for path in &files {
            let station = Self::read_file(path)?;
            metrics::counter!("ingestion_files_read_total").increment(1);
            if !request.wants_station(station.id()) {
                continue;
            }
            match merged.get_mut(station.id()) {
                Some(existing) => merge(existing, station),
                None => {
                    merged.insert(station.id().clone(), station);
                }
            }
        }

        let stations: Vec<Station> = merged
            .into_values()
            .map(|mut station| {
                station.sort_packets();
                station
            })
            .filter_map(|station| restrict_to_request(station, request))
            .collect();
        metrics::counter!("ingestion_stations_loaded_total", "source" => "json_dir")
            .increment(stations.len() as u64);
        Ok(stations)
    }
}
