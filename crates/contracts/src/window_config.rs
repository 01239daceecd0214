//! Data window configuration contracts shared across crates.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{ContractError, ReadRequest, StationId, MICROS_PER_SECOND};

/// Data window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_window_schema"))]
pub struct DataWindowConfig {
    /// Directory holding station files
    pub input_directory: PathBuf,

    /// Stations to keep (None = every station found)
    #[serde(default)]
    pub station_ids: Option<BTreeSet<StationId>>,

    /// Window start (inclusive)
    #[serde(default)]
    pub start_datetime: Option<DateTime<Utc>>,

    /// Window end (inclusive)
    #[serde(default)]
    pub end_datetime: Option<DateTime<Utc>>,

    /// Extra seconds read before the window start
    #[serde(default = "default_padding_s")]
    #[validate(range(min = 0.0))]
    pub start_padding_s: f64,

    /// Extra seconds read after the window end
    #[serde(default = "default_padding_s")]
    #[validate(range(min = 0.0))]
    pub end_padding_s: f64,

    /// Minimum gap between samples that triggers gap filling
    #[serde(default = "default_gap_time_s")]
    #[validate(range(min = 0.0))]
    pub gap_time_s: f64,

    /// Apply the best time-sync offset to every timestamp
    #[serde(default = "default_true")]
    pub apply_correction: bool,

    /// `<dir>/<station_id>/*.json` instead of `<dir>/*.json`
    #[serde(default = "default_true")]
    pub structured_layout: bool,

    /// Sensor length above which gap filling splits the series
    #[serde(default = "default_gap_fill_chunk_size")]
    #[validate(range(min = 2))]
    pub gap_fill_chunk_size: usize,
}

fn default_padding_s() -> f64 {
    120.0
}

fn default_gap_time_s() -> f64 {
    0.25
}

fn default_true() -> bool {
    true
}

fn default_gap_fill_chunk_size() -> usize {
    1000
}

fn validate_window_bounds(config: &DataWindowConfig) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (config.start_datetime, config.end_datetime) {
        if start > end {
            return Err(ValidationError::new("start_after_end")
                .with_message("start_datetime must be <= end_datetime".into()));
        }
    }
    Ok(())
}

fn validate_station_filter(config: &DataWindowConfig) -> Result<(), ValidationError> {
    if let Some(ids) = &config.station_ids {
        if ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ValidationError::new("empty_station_id")
                .with_message("station ids cannot be empty".into()));
        }
    }
    Ok(())
}

fn validate_window_schema(config: &DataWindowConfig) -> Result<(), ValidationError> {
    validate_window_bounds(config)?;
    validate_station_filter(config)
}

/// First failing field (sorted by name) and its message
fn first_failure(errors: &ValidationErrors) -> (String, String) {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .find_map(|(field, errs)| {
            errs.first().map(|err| {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                (field.to_string(), message)
            })
        })
        .unwrap_or_else(|| ("config".to_string(), errors.to_string()))
}

fn datetime_to_micros(dt: DateTime<Utc>) -> f64 {
    dt.timestamp_micros() as f64
}

impl DataWindowConfig {
    /// Configuration with every default and no filters
    pub fn new(input_directory: impl Into<PathBuf>) -> Self {
        Self {
            input_directory: input_directory.into(),
            station_ids: None,
            start_datetime: None,
            end_datetime: None,
            start_padding_s: default_padding_s(),
            end_padding_s: default_padding_s(),
            gap_time_s: default_gap_time_s(),
            apply_correction: true,
            structured_layout: true,
            gap_fill_chunk_size: default_gap_fill_chunk_size(),
        }
    }

    /// Run every validation rule
    ///
    /// # Errors
    /// `ConfigValidation` naming the first failing field.
    pub fn check(&self) -> Result<(), ContractError> {
        self.validate().map_err(|errors| {
            let (field, message) = first_failure(&errors);
            ContractError::config_validation(field, message)
        })
    }

    /// True if both window bounds were given explicitly
    pub fn has_time_window(&self) -> bool {
        self.start_datetime.is_some() && self.end_datetime.is_some()
    }

    /// Window start in microseconds
    pub fn start_timestamp_us(&self) -> Option<f64> {
        self.start_datetime.map(datetime_to_micros)
    }

    /// Window end in microseconds
    pub fn end_timestamp_us(&self) -> Option<f64> {
        self.end_datetime.map(datetime_to_micros)
    }

    /// Start of the read range (window start minus padding)
    pub fn padded_start_timestamp_us(&self) -> Option<f64> {
        self.start_timestamp_us()
            .map(|start| start - self.start_padding_s * MICROS_PER_SECOND)
    }

    /// End of the read range (window end plus padding)
    pub fn padded_end_timestamp_us(&self) -> Option<f64> {
        self.end_timestamp_us()
            .map(|end| end + self.end_padding_s * MICROS_PER_SECOND)
    }

    /// True if the station passes the id filter
    pub fn accepts_station(&self, station_id: &str) -> bool {
        self.station_ids
            .as_ref()
            .map(|ids| ids.iter().any(|id| id == station_id))
            .unwrap_or(true)
    }

    /// Build the request handed to the station source
    pub fn read_request(&self) -> ReadRequest {
        ReadRequest {
            input_directory: self.input_directory.clone(),
            station_ids: self.station_ids.clone(),
            start_timestamp_us: self.padded_start_timestamp_us(),
            end_timestamp_us: self.padded_end_timestamp_us(),
            structured_layout: self.structured_layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window(start_s: i64, end_s: i64) -> DataWindowConfig {
        let mut config = DataWindowConfig::new("/data");
        config.start_datetime = Utc.timestamp_opt(start_s, 0).single();
        config.end_datetime = Utc.timestamp_opt(end_s, 0).single();
        config
    }

    #[test]
    fn test_defaults_from_minimal_json() {
        let config: DataWindowConfig =
            serde_json::from_str(r#"{ "input_directory": "/data" }"#).unwrap();
        assert_eq!(config, DataWindowConfig::new("/data"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_padded_read_range() {
        let config = window(1_000, 2_000);
        assert_eq!(config.start_timestamp_us(), Some(1.0e9));
        assert_eq!(config.padded_start_timestamp_us(), Some(1.0e9 - 120.0e6));
        assert_eq!(config.padded_end_timestamp_us(), Some(2.0e9 + 120.0e6));

        let request = config.read_request();
        assert_eq!(request.start_timestamp_us, Some(1.0e9 - 120.0e6));
        assert!(request.structured_layout);
    }

    #[test]
    fn test_start_after_end_rejected() {
        let config = window(2_000, 1_000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_padding_rejected() {
        let mut config = DataWindowConfig::new("/data");
        config.start_padding_s = -1.0;
        assert!(config.validate().is_err());

        match config.check() {
            Err(ContractError::ConfigValidation { field, .. }) => {
                assert_eq!(field, "start_padding_s")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_small_chunk_rejected() {
        let mut config = DataWindowConfig::new("/data");
        config.gap_fill_chunk_size = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_station_filter() {
        let mut config = DataWindowConfig::new("/data");
        assert!(config.accepts_station("anything"));

        config.station_ids = Some(["1637610021".into()].into_iter().collect());
        assert!(config.accepts_station("1637610021"));
        assert!(!config.accepts_station("0000000000"));

        config.station_ids = Some(["  ".into()].into_iter().collect());
        assert!(config.validate().is_err());
    }
}
