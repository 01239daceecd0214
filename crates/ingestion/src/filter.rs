//! Request filtering shared by every source

use contracts::{ReadRequest, Station};

/// Cut a station down to what `request` asks for
///
/// Packets are kept if they touch the requested range, sensor rows if their
/// timestamp lies inside it. Returns `None` if the station is not wanted or
/// nothing is left.
pub(crate) fn restrict_to_request(mut station: Station, request: &ReadRequest) -> Option<Station> {
    if !request.wants_station(station.id()) {
        return None;
    }
    let start = request.start_timestamp_us.unwrap_or(f64::NEG_INFINITY);
    let end = request.end_timestamp_us.unwrap_or(f64::INFINITY);

    station
        .packets
        .retain(|p| request.wants_range(p.packet_start_timestamp, p.packet_end_timestamp));
    for sensor in station.sensors.values_mut() {
        sensor.data = sensor.data.filter_range(start, end);
    }
    station.sensors.retain(|_, sensor| !sensor.data.is_empty());

    if station.packets.is_empty() && station.sensors.is_empty() {
        tracing::debug!(station_id = %station.id(), "nothing inside the requested range");
        return None;
    }
    Some(station)
}
