//! Station-level timestamp correction.

use contracts::{ContractError, Station, UNALTERED_TIMESTAMPS_COLUMN};
use timesync::TimeSyncAnalysis;

/// Add the analysis' best offset to every station-clock timestamp
///
/// Sensor timestamps and packet start/end times move; server timestamps and
/// exchange timestamps stay as recorded. Each sensor keeps its raw timestamps
/// in an `unaltered_timestamps` column. A station already corrected is left
/// alone. Returns the offset applied (microseconds).
pub fn correct_station(
    station: &mut Station,
    analysis: &TimeSyncAnalysis,
) -> Result<f64, ContractError> {
    if station.timestamps_corrected {
        tracing::debug!(station_id = %station.id(), "timestamps already corrected");
        return Ok(0.0);
    }
    let offset = analysis.offset_correction();

    for sensor in station.sensors.values_mut() {
        if !sensor.data.has_column(UNALTERED_TIMESTAMPS_COLUMN) {
            let raw = sensor.data.timestamps().to_vec();
            sensor.data.insert_column(UNALTERED_TIMESTAMPS_COLUMN, raw)?;
        }
        sensor.data.map_timestamps(|t| t + offset);
    }
    for packet in station.packets.iter_mut() {
        packet.shift_timestamps(offset);
    }

    let timing = &mut station.metadata.timing;
    timing.station_start_timestamp += offset;
    if let Some(first) = timing.station_first_data_timestamp.as_mut() {
        *first += offset;
    }
    station.timestamps_corrected = true;

    tracing::debug!(station_id = %station.id(), offset, "applied time sync offset");
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        DataPacket, SensorData, SensorTable, SensorType, StationMetadata, StationTiming,
    };

    fn station_with_offset(best_offset: f64) -> Station {
        let mut station = Station::new(StationMetadata {
            station_id: "300".into(),
            station_uuid: String::new(),
            make: String::new(),
            model: String::new(),
            timing: StationTiming {
                station_start_timestamp: 0.0,
                audio_sample_rate_hz: 10.0,
                station_first_data_timestamp: None,
                episode_start_timestamp: None,
                episode_end_timestamp: None,
            },
        });
        station.packets.push(DataPacket {
            server_timestamp: 2.0e6,
            packet_start_timestamp: 0.0,
            packet_end_timestamp: 1.0e6,
            num_audio_samples: 10,
            timesync: Vec::new(),
            best_latency: Some(100.0),
            best_offset: Some(best_offset),
        });
        let table = SensorTable::new((0..10).map(|i| i as f64 * 1.0e5).collect())
            .with_column("microphone", vec![0.5; 10])
            .unwrap();
        station.insert_sensor(SensorData::fixed_rate("mic", SensorType::Audio, table, 10.0));
        station
    }

    #[test]
    fn test_offset_applied_everywhere() {
        let mut station = station_with_offset(250.0);
        let analysis = TimeSyncAnalysis::from_station(&station).unwrap();

        let applied = correct_station(&mut station, &analysis).unwrap();
        assert_eq!(applied, 250.0);

        let audio = station.audio_sensor().unwrap();
        assert_eq!(audio.data.timestamps()[0], 250.0);
        assert_eq!(audio.data.column(UNALTERED_TIMESTAMPS_COLUMN).unwrap()[0], 0.0);
        assert_eq!(station.packets[0].packet_start_timestamp, 250.0);
        assert_eq!(station.packets[0].server_timestamp, 2.0e6);
        assert_eq!(station.metadata.timing.station_start_timestamp, 250.0);
        assert!(station.timestamps_corrected);
    }

    #[test]
    fn test_second_correction_is_noop() {
        let mut station = station_with_offset(250.0);
        let analysis = TimeSyncAnalysis::from_station(&station).unwrap();
        correct_station(&mut station, &analysis).unwrap();
        assert_eq!(correct_station(&mut station, &analysis).unwrap(), 0.0);
        assert_eq!(station.audio_sensor().unwrap().data.timestamps()[0], 250.0);
    }
}
