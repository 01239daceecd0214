//! Sensor time series
//!
//! A sensor is a table with a fully populated `timestamps` column
//! (microseconds since epoch) and any number of `f64` payload columns.
//! Missing payload values are NaN.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Name of the column holding raw timestamps before offset correction
pub const UNALTERED_TIMESTAMPS_COLUMN: &str = "unaltered_timestamps";

/// Microseconds in one second
pub const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Sensor kind
///
/// Audio is the existence criterion for a station.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    Audio,
    CompressedAudio,
    Pressure,
    Light,
    Proximity,
    Accelerometer,
    Gyroscope,
    Magnetometer,
    Gravity,
    LinearAcceleration,
    Orientation,
    RotationVector,
    AmbientTemperature,
    RelativeHumidity,
    Location,
    StationHealth,
    Unknown,
}

impl SensorType {
    /// Lowercase name used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Audio => "audio",
            SensorType::CompressedAudio => "compressed_audio",
            SensorType::Pressure => "pressure",
            SensorType::Light => "light",
            SensorType::Proximity => "proximity",
            SensorType::Accelerometer => "accelerometer",
            SensorType::Gyroscope => "gyroscope",
            SensorType::Magnetometer => "magnetometer",
            SensorType::Gravity => "gravity",
            SensorType::LinearAcceleration => "linear_acceleration",
            SensorType::Orientation => "orientation",
            SensorType::RotationVector => "rotation_vector",
            SensorType::AmbientTemperature => "ambient_temperature",
            SensorType::RelativeHumidity => "relative_humidity",
            SensorType::Location => "location",
            SensorType::StationHealth => "station_health",
            SensorType::Unknown => "unknown",
        }
    }
}

/// Serialized form of [`SensorTable`]
///
/// NaN payload values travel as `null`; lengths are checked on conversion.
#[derive(Serialize, Deserialize)]
struct SensorTableRepr {
    timestamps: Vec<f64>,
    #[serde(default)]
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl TryFrom<SensorTableRepr> for SensorTable {
    type Error = ContractError;

    fn try_from(repr: SensorTableRepr) -> Result<Self, Self::Error> {
        let mut table = SensorTable::new(repr.timestamps);
        for (name, values) in repr.columns {
            let values = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            table.insert_column(name, values)?;
        }
        Ok(table)
    }
}

impl From<SensorTable> for SensorTableRepr {
    fn from(table: SensorTable) -> Self {
        Self {
            timestamps: table.timestamps,
            columns: table
                .columns
                .into_iter()
                .map(|(name, values)| {
                    let values = values
                        .into_iter()
                        .map(|v| if v.is_nan() { None } else { Some(v) })
                        .collect();
                    (name, values)
                })
                .collect(),
        }
    }
}

/// Columnar time series table
///
/// Every payload column has exactly one value per timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SensorTableRepr", into = "SensorTableRepr")]
pub struct SensorTable {
    timestamps: Vec<f64>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl SensorTable {
    /// Create a table with only a timestamps column
    pub fn new(timestamps: Vec<f64>) -> Self {
        Self {
            timestamps,
            columns: BTreeMap::new(),
        }
    }

    /// Builder-style column insertion
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, ContractError> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    /// Insert or replace a payload column
    ///
    /// # Errors
    /// The column length differs from the number of timestamps.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), ContractError> {
        let name = name.into();
        if values.len() != self.timestamps.len() {
            return Err(ContractError::length_mismatch(
                format!("column '{name}'"),
                self.timestamps.len(),
                values.len(),
            ));
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Number of rows
    #[inline]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// True if the table has no rows
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Timestamps column
    #[inline]
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// Payload column by name
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// True if the payload column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Payload column names in sorted order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Count of non-NaN values in a payload column
    pub fn valid_count(&self, name: &str) -> usize {
        self.column(name)
            .map(|values| values.iter().filter(|v| !v.is_nan()).count())
            .unwrap_or(0)
    }

    /// Smallest timestamp
    pub fn first_timestamp(&self) -> Option<f64> {
        self.timestamps.iter().copied().reduce(f64::min)
    }

    /// Largest timestamp
    pub fn last_timestamp(&self) -> Option<f64> {
        self.timestamps.iter().copied().reduce(f64::max)
    }

    /// True if timestamps are non-decreasing
    pub fn is_sorted(&self) -> bool {
        self.timestamps.windows(2).all(|w| w[0] <= w[1])
    }

    /// Rows at `indices`, in the given order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            timestamps: indices.iter().map(|&i| self.timestamps[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|(name, values)| (name.clone(), indices.iter().map(|&i| values[i]).collect()))
                .collect(),
        }
    }

    /// Rows ordered by timestamp; equal timestamps keep their relative order
    pub fn sorted(&self) -> Self {
        if self.is_sorted() {
            return self.clone();
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| {
            self.timestamps[a]
                .partial_cmp(&self.timestamps[b])
                .unwrap_or(Ordering::Equal)
        });
        self.select(&order)
    }

    /// Rows with `start <= timestamp <= end`
    pub fn filter_range(&self, start: f64, end: f64) -> Self {
        let indices: Vec<usize> = self
            .timestamps
            .iter()
            .enumerate()
            .filter(|(_, &t)| start <= t && t <= end)
            .map(|(i, _)| i)
            .collect();
        self.select(&indices)
    }

    /// Append rows with the given timestamps and NaN in every payload column
    ///
    /// The result is not re-sorted.
    pub fn append_dataless(&mut self, timestamps: &[f64]) {
        self.timestamps.extend_from_slice(timestamps);
        for values in self.columns.values_mut() {
            values.extend(std::iter::repeat(f64::NAN).take(timestamps.len()));
        }
    }

    /// Append all rows of `other`
    ///
    /// Columns missing on either side are filled with NaN.
    pub fn append(&mut self, other: &SensorTable) {
        let own_len = self.len();
        for name in other.columns.keys() {
            self.columns
                .entry(name.clone())
                .or_insert_with(|| vec![f64::NAN; own_len]);
        }
        for (name, values) in self.columns.iter_mut() {
            match other.columns.get(name) {
                Some(extra) => values.extend_from_slice(extra),
                None => values.extend(std::iter::repeat(f64::NAN).take(other.len())),
            }
        }
        self.timestamps.extend_from_slice(&other.timestamps);
    }

    /// Apply `f` to every timestamp in place
    pub fn map_timestamps(&mut self, f: impl Fn(f64) -> f64) {
        for t in self.timestamps.iter_mut() {
            *t = f(*t);
        }
    }
}

/// One sensor of a station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorData {
    /// Sensor name as reported by the station
    pub name: String,

    /// Sensor kind
    pub sensor_type: SensorType,

    /// Time series, kept sorted by timestamp
    pub data: SensorTable,

    /// Sample rate (Hz)
    #[serde(with = "nan_as_null")]
    pub sample_rate_hz: f64,

    /// Sample interval (seconds)
    #[serde(with = "nan_as_null")]
    pub sample_interval_s: f64,

    /// Standard deviation of the sample interval (seconds)
    #[serde(default, with = "nan_as_null")]
    pub sample_interval_std_s: f64,

    /// True if the sensor samples at a fixed rate
    pub is_sample_rate_fixed: bool,
}

impl SensorData {
    /// Create a fixed-rate sensor
    pub fn fixed_rate(
        name: impl Into<String>,
        sensor_type: SensorType,
        data: SensorTable,
        sample_rate_hz: f64,
    ) -> Self {
        Self {
            name: name.into(),
            sensor_type,
            data: data.sorted(),
            sample_rate_hz,
            sample_interval_s: 1.0 / sample_rate_hz,
            sample_interval_std_s: 0.0,
            is_sample_rate_fixed: true,
        }
    }

    /// Create a sensor whose rate is estimated from its timestamps
    ///
    /// Fewer than two samples leave the interval undefined (NaN).
    pub fn unevenly_sampled(
        name: impl Into<String>,
        sensor_type: SensorType,
        data: SensorTable,
    ) -> Self {
        let data = data.sorted();
        let (sample_interval_s, sample_interval_std_s) = interval_stats_s(data.timestamps());
        Self {
            name: name.into(),
            sensor_type,
            data,
            sample_rate_hz: 1.0 / sample_interval_s,
            sample_interval_s,
            sample_interval_std_s,
            is_sample_rate_fixed: false,
        }
    }

    /// Sample interval in microseconds
    #[inline]
    pub fn sample_interval_us(&self) -> f64 {
        self.sample_interval_s * MICROS_PER_SECOND
    }

    /// True if the sample interval cannot drive gap filling or padding
    pub fn is_sample_interval_invalid(&self) -> bool {
        !(self.sample_interval_s.is_finite() && self.sample_interval_s > 0.0)
    }

    /// Number of rows
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.data.len()
    }

    /// First timestamp (microseconds)
    pub fn first_data_timestamp(&self) -> Option<f64> {
        self.data.first_timestamp()
    }

    /// Last timestamp (microseconds)
    pub fn last_data_timestamp(&self) -> Option<f64> {
        self.data.last_timestamp()
    }
}

/// Mean and population std of consecutive timestamp differences, in seconds
fn interval_stats_s(timestamps: &[f64]) -> (f64, f64) {
    if timestamps.len() < 2 {
        return (f64::NAN, f64::NAN);
    }
    let diffs: Vec<f64> = timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]) / MICROS_PER_SECOND)
        .collect();
    let n = diffs.len() as f64;
    let mean = diffs.iter().sum::<f64>() / n;
    let variance = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// NaN scalars travel as `null`
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
