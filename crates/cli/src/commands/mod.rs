//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_window;
pub use validate::run_validate;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use config_loader::ConfigLoader;
use contracts::{DataWindowConfig, StationSource};
use ingestion::{JsonDirSource, MockStationConfig, MockStationSource};
use tracing::info;

use crate::cli::{SourceKind, WindowArgs};
use crate::error::CliError;

/// Load the configuration file (if any) and apply the CLI overrides
pub(crate) fn resolve_config(args: &WindowArgs) -> Result<DataWindowConfig> {
    let mut config = match (&args.config, &args.input_dir) {
        (Some(path), _) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()).into());
            }
            ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        (None, Some(dir)) => DataWindowConfig::new(dir),
        (None, None) if args.source == SourceKind::Mock => DataWindowConfig::new("mock"),
        (None, None) => return Err(CliError::MissingInput.into()),
    };

    if let Some(dir) = &args.input_dir {
        config.input_directory = dir.clone();
    }
    if !args.stations.is_empty() {
        config.station_ids = Some(args.stations.iter().map(|id| id.as_str().into()).collect());
    }
    if let Some(start) = &args.start {
        config.start_datetime = Some(parse_datetime(start)?);
    }
    if let Some(end) = &args.end {
        config.end_datetime = Some(parse_datetime(end)?);
    }
    if args.no_correction {
        config.apply_correction = false;
    }
    if args.flat {
        config.structured_layout = false;
    }

    ConfigLoader::validate(&config).context("Invalid window configuration")?;
    info!(
        input = %config.input_directory.display(),
        stations = ?config.station_ids,
        start = ?config.start_datetime,
        end = ?config.end_datetime,
        correction = config.apply_correction,
        "Configuration resolved"
    );
    Ok(config)
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>, CliError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CliError::invalid_datetime(value, e.to_string()))
}

/// Station source selected on the command line
pub(crate) fn build_source(kind: SourceKind) -> Box<dyn StationSource> {
    match kind {
        SourceKind::Json => Box::new(JsonDirSource::new()),
        SourceKind::Mock => Box::new(demo_source()),
    }
}

/// Three 80 Hz stations with different clocks, one with a dropped packet
fn demo_source() -> MockStationSource {
    MockStationSource::new(vec![
        MockStationConfig::new("1637610021", 80.0, 30).with_clock(2_500.0, 800.0),
        MockStationConfig::new("1637610022", 80.0, 30)
            .with_clock(-12_000.0, 1_500.0)
            .with_missing_packet(12)
            .with_empty_exchanges(3)
            .with_barometer(5.0),
        MockStationConfig::new("1637610023", 80.0, 30)
            .with_clock(40_000.0, 600.0)
            .with_packet_latency(7, 250.0),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_applied() {
        let args = WindowArgs {
            input_dir: Some("/data".into()),
            stations: vec!["100".into()],
            start: Some("2021-11-22T18:00:00Z".into()),
            end: Some("2021-11-22T20:00:00+01:00".into()),
            no_correction: true,
            flat: true,
            ..Default::default()
        };
        let config = resolve_config(&args).unwrap();
        assert!(config.accepts_station("100"));
        assert!(!config.accepts_station("200"));
        assert!(!config.apply_correction);
        assert!(!config.structured_layout);
        let span = config.end_datetime.unwrap() - config.start_datetime.unwrap();
        assert_eq!(span.num_hours(), 1);
    }

    #[test]
    fn test_missing_input_rejected() {
        let err = resolve_config(&WindowArgs::default()).unwrap_err();
        assert!(err.to_string().contains("No input"));
    }

    #[test]
    fn test_bad_datetime_rejected() {
        let args = WindowArgs {
            input_dir: Some("/data".into()),
            start: Some("noon".into()),
            ..Default::default()
        };
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn test_config_file_with_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window.toml");
        std::fs::write(&path, "input_directory = \"/from/file\"\ngap_time_s = 1.0\n").unwrap();

        let args = WindowArgs {
            config: Some(path),
            input_dir: Some("/from/cli".into()),
            ..Default::default()
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.input_directory.to_str(), Some("/from/cli"));
        assert_eq!(config.gap_time_s, 1.0);
    }
}
