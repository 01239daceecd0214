//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Time sync analysis on generated stations
//! - Mock source → data window
//! - JSON files → configuration → data window

#[cfg(test)]
mod timesync_tests {
    use ingestion::MockStationConfig;
    use timesync::TimeSyncAnalysis;

    #[test]
    fn test_empty_exchange_packet_is_ignored() {
        let station = MockStationConfig::new("100", 100.0, 3)
            .with_clock(0.0, 800.0)
            .with_packet_latency(2, 300.0)
            .with_empty_exchanges(1)
            .build();

        let analysis = TimeSyncAnalysis::from_station(&station).unwrap();
        assert_eq!(analysis.num_packets(), 3);
        assert_eq!(analysis.bad_packets(), vec![1]);
        assert_eq!(analysis.best_latency_index(), 2);
        // equal exchange counts: the mean of the two usable packets
        assert!((analysis.mean_latency().unwrap() - 550.0).abs() < 1e-3);
        assert!((analysis.latency_std().unwrap() - 250.0).abs() < 1e-3);
    }

    #[test]
    fn test_clock_offset_recovered() {
        let station = MockStationConfig::new("100", 80.0, 5)
            .with_clock(-12_345.0, 420.0)
            .build();

        let analysis = TimeSyncAnalysis::from_station(&station).unwrap();
        assert!((analysis.best_latency().unwrap().unwrap() - 420.0).abs() < 1e-3);
        assert!((analysis.best_offset().unwrap().unwrap() + 12_345.0).abs() < 1e-3);
        assert!((analysis.offset_correction() + 12_345.0).abs() < 1e-3);
        assert!(timesync::validate_sensors(&analysis));
    }
}

#[cfg(test)]
mod e2e_tests {
    use chrono::{TimeZone, Utc};
    use config_loader::ConfigLoader;
    use contracts::{DataWindowConfig, SensorType, StationId, MICROS_PER_SECOND};
    use data_window::DataWindow;
    use ingestion::{JsonDirSource, MockStationConfig, MockStationSource};
    use observability::{record_window_metrics, WindowMetricsAggregator};

    const T0_S: i64 = 1_637_604_000;
    const T0_US: f64 = T0_S as f64 * MICROS_PER_SECOND;

    fn window_config(start_s: i64, end_s: i64) -> DataWindowConfig {
        let mut config = DataWindowConfig::new("mock");
        config.start_datetime = Utc.timestamp_opt(start_s, 0).single();
        config.end_datetime = Utc.timestamp_opt(end_s, 0).single();
        config
    }

    /// Mock source → data window with padding and truncation
    ///
    /// Audio covers `[t0 + 10 s, t0 + 50 s)`, the window is `[t0, t0 + 60 s]`.
    #[test]
    fn test_e2e_window_is_padded_to_bounds() {
        let source = MockStationSource::new(vec![MockStationConfig::new("100", 100.0, 40)
            .with_start(T0_US + 10.0 * MICROS_PER_SECOND)]);
        let mut config = window_config(T0_S, T0_S + 60);
        config.apply_correction = false;

        let window = DataWindow::new(config, &source).unwrap();
        let audio = window.station("100").unwrap().audio_sensor().unwrap();
        let interval_us = audio.sample_interval_us();

        assert_eq!(audio.first_data_timestamp(), Some(T0_US));
        assert_eq!(
            audio.last_data_timestamp(),
            Some(T0_US + 60.0 * MICROS_PER_SECOND)
        );
        assert_eq!(audio.num_samples(), 1_000 + 4_000 + 1_001);
        assert_eq!(audio.data.valid_count("microphone"), 4_000);

        let timestamps = audio.data.timestamps();
        assert!(timestamps
            .windows(2)
            .all(|w| (w[1] - w[0] - interval_us).abs() < 1.0));

        let microphone = audio.data.column("microphone").unwrap();
        let data_start = T0_US + 10.0 * MICROS_PER_SECOND;
        let data_end = T0_US + 50.0 * MICROS_PER_SECOND;
        for (t, v) in timestamps.iter().zip(microphone) {
            let inside = *t >= data_start && *t < data_end;
            assert_eq!(v.is_nan(), !inside, "row at {t}");
        }

        let summary = &window.summaries()[0];
        assert!(summary.retained);
        assert!(!summary.corrected);
        assert_eq!(summary.window_start_us, Some(T0_US));
        assert_eq!(summary.synthesized_rows(), 2_001);
    }

    #[test]
    fn test_e2e_correction_moves_data_to_server_clock() {
        let source = MockStationSource::new(vec![
            MockStationConfig::new("100", 80.0, 10).with_clock(2_500.0, 400.0),
            MockStationConfig::new("200", 80.0, 10)
                .with_clock(-7_000.0, 900.0)
                .with_missing_packet(4)
                .with_barometer(5.0),
        ]);

        let window = DataWindow::new(DataWindowConfig::new("mock"), &source).unwrap();
        assert_eq!(window.stations().len(), 2);

        let first = window.station("100").unwrap();
        assert!(first.timestamps_corrected);
        let start = first.audio_sensor().unwrap().first_data_timestamp().unwrap();
        assert!((start - (T0_US + 2_500.0)).abs() < 1.0);

        let second = window.station("200").unwrap();
        let audio = second.audio_sensor().unwrap();
        assert!((audio.first_data_timestamp().unwrap() - (T0_US - 7_000.0)).abs() < 1.0);
        // the missing packet is gap-filled with NaN rows
        assert_eq!(audio.num_samples(), 10 * 80);
        assert_eq!(audio.data.valid_count("microphone"), 9 * 80);

        // the barometer is unevenly sampled and shares the hole
        let pressure = second.sensor(SensorType::Pressure).unwrap();
        let config = window.config();
        let max_spacing_us =
            config.gap_time_s.max(pressure.sample_interval_s) * MICROS_PER_SECOND;
        let timestamps = pressure.data.timestamps();
        assert!(timestamps
            .windows(2)
            .all(|w| w[1] - w[0] <= max_spacing_us + 1.0));

        // synthesized rows between real samples are NaN and sit in the hole
        let values = pressure.data.column("pressure").unwrap();
        assert!(pressure.data.valid_count("pressure") < pressure.num_samples());
        let real: Vec<f64> = timestamps
            .iter()
            .zip(values)
            .filter(|(_, v)| !v.is_nan())
            .map(|(t, _)| *t)
            .collect();
        let hole_start = T0_US - 7_000.0 + 3.9e6;
        let hole_end = T0_US - 7_000.0 + 5.3e6;
        let inner_nan = timestamps
            .iter()
            .zip(values)
            .filter(|(t, v)| v.is_nan() && **t > real[0] && **t < real[real.len() - 1])
            .map(|(t, _)| *t)
            .collect::<Vec<_>>();
        assert!(!inner_nan.is_empty());
        assert!(inner_nan.iter().all(|t| *t > hole_start && *t < hole_end));

        let analysis = window.analysis("200").unwrap();
        assert!((analysis.best_latency().unwrap().unwrap() - 900.0).abs() < 1e-3);
    }

    /// JSON files → TOML configuration → data window
    #[test]
    fn test_e2e_json_dir_with_toml_config() {
        let dir = tempfile::tempdir().unwrap();
        for id in ["100", "200"] {
            let station = MockStationConfig::new(id, 80.0, 30).build();
            JsonDirSource::write_station(dir.path(), &station, true).unwrap();
        }

        let config_path = dir.path().join("window.toml");
        std::fs::write(
            &config_path,
            format!(
                r#"
input_directory = {:?}
station_ids = ["200", "300"]
start_datetime = "2021-11-22T18:00:05Z"
end_datetime = "2021-11-22T18:00:20Z"
start_padding_s = 2.0
end_padding_s = 2.0
"#,
                dir.path().display().to_string()
            ),
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&config_path).unwrap();
        assert_eq!(config.start_timestamp_us(), Some(T0_US + 5.0e6));

        let window = DataWindow::new(config, &JsonDirSource::new()).unwrap();
        assert_eq!(window.stations().len(), 1);

        let station = window.station("200").unwrap();
        let audio = station.audio_sensor().unwrap();
        assert!(audio.first_data_timestamp().unwrap() >= T0_US + 5.0e6);
        assert!(audio.last_data_timestamp().unwrap() <= T0_US + 20.0e6);
        assert!(station
            .packets
            .iter()
            .all(|p| p.overlaps(T0_US + 5.0e6, T0_US + 20.0e6)));

        let dropped: Vec<_> = window
            .summaries()
            .iter()
            .filter(|s| !s.retained)
            .map(|s| s.station_id.as_str())
            .collect();
        assert_eq!(dropped, vec!["300"]);
    }

    #[test]
    fn test_e2e_summaries_aggregate() {
        let source = MockStationSource::new(vec![
            MockStationConfig::new("100", 80.0, 6).with_clock(0.0, 500.0),
            MockStationConfig::new("200", 80.0, 6)
                .with_clock(0.0, 1_500.0)
                .with_empty_exchanges(2),
        ]);
        let mut config = DataWindowConfig::new("mock");
        config.station_ids = Some(
            ["100", "200", "300"]
                .into_iter()
                .map(StationId::from)
                .collect(),
        );

        let window = DataWindow::new(config, &source).unwrap();
        let mut aggregator = WindowMetricsAggregator::new();
        for summary in window.summaries() {
            record_window_metrics(summary);
            aggregator.update(summary);
        }

        let summary = aggregator.summary();
        assert_eq!(summary.stations_total, 3);
        assert_eq!(summary.stations_retained, 2);
        assert_eq!(summary.bad_packets, 1);
        assert!((summary.best_latency_us.mean - 1_000.0).abs() < 1e-3);
        assert!(summary.to_string().contains("Dropped: 300"));
    }

    #[test]
    fn test_e2e_empty_directory_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let config = DataWindowConfig::new(dir.path());
        assert!(DataWindow::new(config, &JsonDirSource::new()).is_err());
    }
}
