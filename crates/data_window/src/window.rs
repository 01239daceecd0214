//! Data window builder
//!
//! One pass per station: availability check, time-sync analysis, offset
//! correction, window bounds, packet truncation, then per sensor truncation,
//! gap filling and padding. Stations are independent of each other.

use std::collections::BTreeMap;

use contracts::{
    ContractError, DataWindowConfig, SensorType, SensorWindowSummary, Station, StationId,
    StationSource, StationWindowSummary,
};
use timesync::TimeSyncAnalysis;
use tracing::instrument;

use crate::correction::correct_station;
use crate::gap::gap_filler;
use crate::pad::data_padder;

/// Stations truncated, corrected, gap-filled and padded to one time window
#[derive(Debug, Clone)]
pub struct DataWindow {
    config: DataWindowConfig,
    stations: BTreeMap<StationId, Station>,
    analyses: BTreeMap<StationId, TimeSyncAnalysis>,
    summaries: Vec<StationWindowSummary>,
}

/// Result of processing one station
struct Processed {
    station: Option<Station>,
    analysis: Option<TimeSyncAnalysis>,
    summary: StationWindowSummary,
}

impl Processed {
    fn dropped(station_id: StationId, analysis: Option<TimeSyncAnalysis>) -> Self {
        metrics::counter!("data_window_stations_dropped_total").increment(1);
        Self {
            station: None,
            analysis,
            summary: StationWindowSummary::dropped(station_id),
        }
    }
}

impl DataWindow {
    /// Read stations from `source` and build the window
    ///
    /// # Errors
    /// - The configuration fails validation
    /// - The source fails or returns no stations at all
    #[instrument(name = "data_window_new", skip(config, source), fields(source = source.name()))]
    pub fn new(config: DataWindowConfig, source: &dyn StationSource) -> Result<Self, ContractError> {
        config.check()?;
        let stations = source.read_stations(&config.read_request())?;
        if stations.is_empty() {
            return Err(ContractError::no_data(format!(
                "no station data found in {}",
                config.input_directory.display()
            )));
        }
        tracing::info!(stations = stations.len(), "loaded stations");
        Self::from_stations(config, stations)
    }

    /// Build the window from stations that are already loaded
    ///
    /// Stations failing the id filter are ignored. A window where every station
    /// was dropped is still returned; its summaries say why.
    ///
    /// # Errors
    /// The configuration fails validation.
    pub fn from_stations(
        config: DataWindowConfig,
        stations: Vec<Station>,
    ) -> Result<Self, ContractError> {
        config.check()?;
        let mut window = Self {
            config,
            stations: BTreeMap::new(),
            analyses: BTreeMap::new(),
            summaries: Vec::new(),
        };
        window.build(stations)?;
        Ok(window)
    }

    #[instrument(name = "data_window_build", skip_all, fields(stations = stations.len()))]
    fn build(&mut self, stations: Vec<Station>) -> Result<(), ContractError> {
        let mut by_id: BTreeMap<StationId, Station> = BTreeMap::new();
        for station in stations {
            if !self.config.accepts_station(station.id()) {
                tracing::debug!(station_id = %station.id(), "station not requested");
                continue;
            }
            if by_id.contains_key(station.id()) {
                tracing::warn!(station_id = %station.id(), "duplicate station ignored");
                continue;
            }
            by_id.insert(station.id().clone(), station);
        }

        if let Some(requested) = &self.config.station_ids {
            for id in requested.iter().filter(|id| !by_id.contains_key(*id)) {
                tracing::warn!(station_id = %id, "no data found for requested station");
                self.summaries.push(StationWindowSummary::dropped(id.clone()));
            }
        }

        for (id, station) in by_id {
            let processed = self.process_station(station)?;
            if let Some(analysis) = processed.analysis {
                self.analyses.insert(id.clone(), analysis);
            }
            if let Some(station) = processed.station {
                self.stations.insert(id, station);
            }
            self.summaries.push(processed.summary);
        }
        self.summaries
            .sort_by(|a, b| a.station_id.cmp(&b.station_id));

        if self.stations.is_empty() {
            tracing::warn!("no station has data inside the window");
        }
        Ok(())
    }

    #[instrument(
        name = "data_window_station",
        skip(self, station),
        fields(station_id = %station.id())
    )]
    fn process_station(&self, mut station: Station) -> Result<Processed, ContractError> {
        let station_id = station.id().clone();
        if !station.has_audio_data() {
            tracing::warn!(station_id = %station_id, "station has no audio data, dropping");
            return Ok(Processed::dropped(station_id, None));
        }
        station.sort_packets();

        let analysis = match TimeSyncAnalysis::from_station(&station) {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                tracing::warn!(station_id = %station_id, error = %e, "time sync analysis unavailable");
                None
            }
        };

        let mut corrected = false;
        if self.config.apply_correction {
            if let Some(analysis) = &analysis {
                correct_station(&mut station, analysis)?;
                corrected = true;
            }
        }

        let start = self
            .config
            .start_timestamp_us()
            .or_else(|| station.first_data_timestamp());
        let end = self
            .config
            .end_timestamp_us()
            .or_else(|| station.last_data_timestamp());
        let (Some(start), Some(end)) = (start, end) else {
            tracing::warn!(station_id = %station_id, "window bounds undefined, dropping");
            return Ok(Processed::dropped(station_id, analysis));
        };

        station.packets.retain(|packet| packet.overlaps(start, end));

        let mut sensors = Vec::with_capacity(station.sensors.len());
        let sensor_types: Vec<SensorType> = station.sensors.keys().copied().collect();
        for sensor_type in sensor_types {
            match self.window_sensor(&mut station, sensor_type, start, end) {
                Some(summary) => sensors.push(summary),
                None if sensor_type == SensorType::Audio => {
                    tracing::warn!(
                        station_id = %station_id,
                        "no audio data inside the window, dropping station"
                    );
                    return Ok(Processed::dropped(station_id, analysis));
                }
                None => {}
            }
        }

        let timing = &mut station.metadata.timing;
        timing.station_first_data_timestamp = station
            .sensors
            .get(&SensorType::Audio)
            .and_then(|audio| audio.first_data_timestamp());
        timing.episode_start_timestamp = Some(start);
        timing.episode_end_timestamp = Some(end);

        let summary = StationWindowSummary {
            station_id,
            retained: true,
            window_start_us: Some(start),
            window_end_us: Some(end),
            best_latency_us: analysis.as_ref().and_then(|a| a.best_latency().ok().flatten()),
            best_offset_us: analysis.as_ref().and_then(|a| a.best_offset().ok().flatten()),
            corrected,
            bad_packets: analysis.as_ref().map_or(0, |a| a.bad_packets().len()),
            packets_kept: station.packets.len(),
            sensors,
        };
        Ok(Processed {
            station: Some(station),
            analysis,
            summary,
        })
    }

    /// Truncate, gap-fill and pad one sensor in place
    ///
    /// Returns `None` (and removes the sensor) if nothing is left in the window.
    fn window_sensor(
        &self,
        station: &mut Station,
        sensor_type: SensorType,
        start: f64,
        end: f64,
    ) -> Option<SensorWindowSummary> {
        let sensor = station.sensors.get_mut(&sensor_type)?;
        let truncated = sensor.data.filter_range(start, end);
        if truncated.is_empty() {
            tracing::warn!(
                station_id = %station.metadata.station_id,
                sensor = ?sensor_type,
                "sensor has no samples inside the window"
            );
            station.sensors.remove(&sensor_type);
            return None;
        }

        let truncated_rows = truncated.len();
        if sensor.is_sample_interval_invalid() {
            tracing::warn!(
                station_id = %station.metadata.station_id,
                sensor = ?sensor_type,
                "sample interval undefined, skipping gap filling and padding"
            );
            sensor.data = truncated.sorted();
            return Some(SensorWindowSummary {
                sensor_type,
                rows: truncated_rows,
                gap_rows: 0,
                pad_rows: 0,
            });
        }

        let filled = gap_filler(
            &truncated,
            sensor.sample_interval_s,
            self.config.gap_time_s,
            self.config.gap_fill_chunk_size,
        );
        let padded = data_padder(start, end, &filled, sensor.sample_interval_s);
        let summary = SensorWindowSummary {
            sensor_type,
            rows: padded.len(),
            gap_rows: filled.len() - truncated_rows,
            pad_rows: padded.len() - filled.len(),
        };
        sensor.data = padded;
        Some(summary)
    }

    /// Configuration the window was built with
    pub fn config(&self) -> &DataWindowConfig {
        &self.config
    }

    /// Retained stations by id
    pub fn stations(&self) -> &BTreeMap<StationId, Station> {
        &self.stations
    }

    pub fn station(&self, station_id: &str) -> Option<&Station> {
        self.stations.get(station_id)
    }

    /// Time-sync analysis of a station, kept even if the station was dropped
    pub fn analysis(&self, station_id: &str) -> Option<&TimeSyncAnalysis> {
        self.analyses.get(station_id)
    }

    /// One summary per requested or loaded station, sorted by id
    pub fn summaries(&self) -> &[StationWindowSummary] {
        &self.summaries
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Hand the retained stations over to the caller
    pub fn into_stations(self) -> BTreeMap<StationId, Station> {
        self.stations
    }
}
