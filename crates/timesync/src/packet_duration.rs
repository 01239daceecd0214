//! Nominal packet sizes of the standard station sample rates.

use contracts::MICROS_PER_SECOND;

/// Audio samples per packet for each supported rate (Hz)
const SAMPLES_PER_PACKET: [(u32, usize); 5] = [
    (80, 4_096),
    (800, 4_096),
    (8_000, 4_096),
    (16_000, 8_192),
    (48_000, 16_384),
];

/// Audio samples per packet at `sample_rate_hz`, if it is a standard rate
pub fn samples_per_packet(sample_rate_hz: f64) -> Option<usize> {
    if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
        return None;
    }
    let rate = sample_rate_hz.trunc();
    SAMPLES_PER_PACKET
        .iter()
        .find(|(r, _)| f64::from(*r) == rate)
        .map(|&(_, samples)| samples)
}

/// Packet duration in whole microseconds
///
/// Unknown rates use `fallback_samples`. Non-positive rates give 0.
pub fn packet_duration_us(sample_rate_hz: f64, fallback_samples: usize) -> f64 {
    if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
        return 0.0;
    }
    let samples = samples_per_packet(sample_rate_hz).unwrap_or(fallback_samples);
    (samples as f64 / sample_rate_hz * MICROS_PER_SECOND).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_rates() {
        assert_eq!(samples_per_packet(80.0), Some(4096));
        assert_eq!(samples_per_packet(16_000.0), Some(8192));
        assert_eq!(samples_per_packet(100.0), None);

        assert_eq!(packet_duration_us(80.0, 0), 51_200_000.0);
        assert_eq!(packet_duration_us(800.0, 0), 5_120_000.0);
        assert_eq!(packet_duration_us(8_000.0, 0), 512_000.0);
        assert_eq!(packet_duration_us(16_000.0, 0), 512_000.0);
        assert_eq!(packet_duration_us(48_000.0, 0), 341_333.0);
    }

    #[test]
    fn test_unknown_rate_uses_fallback() {
        assert_eq!(packet_duration_us(100.0, 100), 1_000_000.0);
        assert_eq!(packet_duration_us(0.0, 100), 0.0);
        assert_eq!(packet_duration_us(f64::NAN, 100), 0.0);
    }
}
