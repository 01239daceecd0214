//! Data window metrics
//!
//! Records one set of metrics per station summary and aggregates a run in
//! memory for the end-of-run report.

use std::collections::BTreeMap;

use contracts::{SensorType, StationId, StationWindowSummary};
use metrics::{counter, gauge, histogram};

/// Record the metrics of one station summary
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_window_metrics;
///
/// for summary in window.summaries() {
///     record_window_metrics(summary);
/// }
/// ```
pub fn record_window_metrics(summary: &StationWindowSummary) {
    let station = summary.station_id.to_string();
    let status = if summary.retained { "retained" } else { "dropped" };
    counter!("station_window_stations_total", "status" => status).increment(1);
    if !summary.retained {
        return;
    }

    if let Some(latency) = summary.best_latency_us {
        gauge!("station_window_best_latency_us", "station_id" => station.clone()).set(latency);
        histogram!("station_window_best_latency_us_hist").record(latency);
    }
    if let Some(offset) = summary.best_offset_us {
        gauge!("station_window_best_offset_us", "station_id" => station.clone()).set(offset);
    }
    gauge!("station_window_packets_kept", "station_id" => station.clone())
        .set(summary.packets_kept as f64);
    if summary.bad_packets > 0 {
        counter!("station_window_bad_packets_total", "station_id" => station)
            .increment(summary.bad_packets as u64);
    }

    for sensor in &summary.sensors {
        let kind = sensor.sensor_type.as_str();
        histogram!("station_window_sensor_rows", "sensor" => kind).record(sensor.rows as f64);
        if sensor.gap_rows > 0 {
            counter!("station_window_synthesized_rows_total", "sensor" => kind, "kind" => "gap")
                .increment(sensor.gap_rows as u64);
        }
        if sensor.pad_rows > 0 {
            counter!("station_window_synthesized_rows_total", "sensor" => kind, "kind" => "pad")
                .increment(sensor.pad_rows as u64);
        }
    }
}

/// In-memory aggregation of window summaries
#[derive(Debug, Clone, Default)]
pub struct WindowMetricsAggregator {
    pub stations_total: u64,
    pub stations_retained: u64,
    pub stations_corrected: u64,
    pub bad_packets: u64,
    pub dropped_stations: Vec<StationId>,

    /// Best latency across retained stations (microseconds)
    pub latency_stats: RunningStats,

    /// Best offset across retained stations (microseconds)
    pub offset_stats: RunningStats,

    /// (rows, gap rows, pad rows) per sensor kind
    pub sensor_rows: BTreeMap<SensorType, (u64, u64, u64)>,
}

impl WindowMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, summary: &StationWindowSummary) {
        self.stations_total += 1;
        if !summary.retained {
            self.dropped_stations.push(summary.station_id.clone());
            return;
        }
        self.stations_retained += 1;
        if summary.corrected {
            self.stations_corrected += 1;
        }
        self.bad_packets += summary.bad_packets as u64;
        if let Some(latency) = summary.best_latency_us {
            self.latency_stats.push(latency);
        }
        if let Some(offset) = summary.best_offset_us {
            self.offset_stats.push(offset);
        }
        for sensor in &summary.sensors {
            let entry = self.sensor_rows.entry(sensor.sensor_type).or_default();
            entry.0 += sensor.rows as u64;
            entry.1 += sensor.gap_rows as u64;
            entry.2 += sensor.pad_rows as u64;
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            stations_total: self.stations_total,
            stations_retained: self.stations_retained,
            stations_corrected: self.stations_corrected,
            bad_packets: self.bad_packets,
            dropped_stations: self.dropped_stations.clone(),
            best_latency_us: StatsSummary::from(&self.latency_stats),
            best_offset_us: StatsSummary::from(&self.offset_stats),
            sensor_rows: self.sensor_rows.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// End-of-run report
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub stations_total: u64,
    pub stations_retained: u64,
    pub stations_corrected: u64,
    pub bad_packets: u64,
    pub dropped_stations: Vec<StationId>,
    pub best_latency_us: StatsSummary,
    pub best_offset_us: StatsSummary,
    pub sensor_rows: BTreeMap<SensorType, (u64, u64, u64)>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Data Window Summary ===")?;
        writeln!(
            f,
            "Stations: {} retained of {} ({} corrected)",
            self.stations_retained, self.stations_total, self.stations_corrected
        )?;
        if !self.dropped_stations.is_empty() {
            let ids: Vec<&str> = self.dropped_stations.iter().map(|id| id.as_str()).collect();
            writeln!(f, "Dropped: {}", ids.join(", "))?;
        }
        writeln!(f, "Bad packets: {}", self.bad_packets)?;
        writeln!(f, "Best latency (us): {}", self.best_latency_us)?;
        writeln!(f, "Best offset (us): {}", self.best_offset_us)?;

        if !self.sensor_rows.is_empty() {
            writeln!(f, "Sensor rows (total / gap / pad):")?;
            for (sensor, (rows, gap, pad)) in &self.sensor_rows {
                writeln!(f, "  {}: {rows} / {gap} / {pad}", sensor.as_str())?;
            }
        }
        Ok(())
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "N/A");
        }
        write!(
            f,
            "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
            self.min, self.max, self.mean, self.std_dev, self.count
        )
    }
}

/// Streaming mean and variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a value; non-finite values are ignored
    pub fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
