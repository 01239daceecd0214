//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::Station;
use serde::Serialize;
use timesync::{validate_sensors, TimeSyncAnalysis};
use tracing::{info, warn};

use super::{build_source, resolve_config};
use crate::cli::InfoArgs;

/// Time sync report of one station
#[derive(Serialize)]
struct StationInfo {
    station_id: String,
    make: String,
    model: String,
    audio_sample_rate_hz: f64,
    packets: usize,
    sensors: Vec<String>,
    consistent: bool,
    best_latency_us: Option<f64>,
    best_offset_us: Option<f64>,
    mean_latency_us: Option<f64>,
    latency_std_us: Option<f64>,
    mean_offset_us: Option<f64>,
    offset_std_us: Option<f64>,
    best_packet: usize,
    bad_packets: Vec<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    packet_details: Vec<PacketInfo>,
}

#[derive(Serialize)]
struct PacketInfo {
    start_us: f64,
    latency_us: Option<f64>,
    offset_us: Option<f64>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let config = resolve_config(&args.window)?;
    let source = build_source(args.window.source);
    let stations = source
        .read_stations(&config.read_request())
        .context("Failed to read stations")?;
    info!(stations = stations.len(), "Stations loaded");

    let infos: Vec<StationInfo> = stations
        .iter()
        .filter_map(|station| station_info(station, args.packets))
        .collect();

    if args.json {
        let json =
            serde_json::to_string_pretty(&infos).context("Failed to serialize station info")?;
        println!("{json}");
    } else {
        for station in &infos {
            print_station_info(station);
        }
    }
    Ok(())
}

fn station_info(station: &Station, with_packets: bool) -> Option<StationInfo> {
    let analysis = match TimeSyncAnalysis::from_station(station) {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!(station_id = %station.id(), error = %e, "Skipping station");
            return None;
        }
    };

    let packet_details = if with_packets {
        analysis
            .start_times()
            .into_iter()
            .zip(analysis.latencies())
            .zip(analysis.offsets())
            .map(|((start_us, latency_us), offset_us)| PacketInfo {
                start_us,
                latency_us,
                offset_us,
            })
            .collect()
    } else {
        Vec::new()
    };

    Some(StationInfo {
        station_id: station.id().to_string(),
        make: station.metadata.make.clone(),
        model: station.metadata.model.clone(),
        audio_sample_rate_hz: station.metadata.timing.audio_sample_rate_hz,
        packets: analysis.num_packets(),
        sensors: station
            .sensors
            .keys()
            .map(|kind| kind.as_str().to_string())
            .collect(),
        consistent: validate_sensors(&analysis),
        best_latency_us: analysis.best_latency().ok().flatten(),
        best_offset_us: analysis.best_offset().ok().flatten(),
        mean_latency_us: analysis.mean_latency(),
        latency_std_us: analysis.latency_std(),
        mean_offset_us: analysis.mean_offset(),
        offset_std_us: analysis.offset_std(),
        best_packet: analysis.best_latency_index(),
        bad_packets: analysis.bad_packets(),
        packet_details,
    })
}

fn fmt_us(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1} us"))
}

fn print_station_info(info: &StationInfo) {
    println!("\n=== Station {} ===", info.station_id);
    if !info.make.is_empty() || !info.model.is_empty() {
        println!("  Device: {} {}", info.make, info.model);
    }
    println!("  Audio rate: {} Hz", info.audio_sample_rate_hz);
    println!("  Sensors: {}", info.sensors.join(", "));
    println!(
        "  Packets: {} (best #{}, {} bad)",
        info.packets,
        info.best_packet,
        info.bad_packets.len()
    );
    if !info.consistent {
        println!("  ⚠ sample rate or start time changes between packets");
    }
    println!("  Best latency: {}", fmt_us(info.best_latency_us));
    println!("  Best offset: {}", fmt_us(info.best_offset_us));
    println!(
        "  Latency: {} ± {}",
        fmt_us(info.mean_latency_us),
        fmt_us(info.latency_std_us)
    );
    println!(
        "  Offset: {} ± {}",
        fmt_us(info.mean_offset_us),
        fmt_us(info.offset_std_us)
    );

    for packet in &info.packet_details {
        println!(
            "    {:.0}: latency {}, offset {}",
            packet.start_us,
            fmt_us(packet.latency_us),
            fmt_us(packet.offset_us)
        );
    }
}
