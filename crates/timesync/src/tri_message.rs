//! Tri-message latency/offset estimation.
//!
//! One exchange is three messages: server → station (a1 → b1),
//! station → server (b2 → a2) and server → station (a3 → b3). Each leg pair
//! gives an independent latency and offset estimate:
//!
//! ```text
//! latency1 = ((a2 - a1) - (b2 - b1)) / 2    offset1 = ((a1 - b1) + (a2 - b2)) / 2
//! latency3 = ((b3 - b2) - (a3 - a2)) / 2    offset3 = ((a2 - b2) + (a3 - b3)) / 2
//! ```
//!
//! Offsets are "server minus station": adding one to a station timestamp
//! yields server time.

use contracts::{ContractError, StationId, TimeSyncExchange};

/// Per-exchange latency and offset estimates for one packet
#[derive(Debug, Clone, PartialEq)]
pub struct TriMessageStats {
    station_id: StationId,
    latency1: Vec<f64>,
    latency3: Vec<f64>,
    offset1: Vec<f64>,
    offset3: Vec<f64>,
    best_latency_index: Option<usize>,
}

impl TriMessageStats {
    /// Compute estimates for every exchange
    pub fn new(station_id: StationId, exchanges: &[TimeSyncExchange]) -> Self {
        let latency1 = exchanges
            .iter()
            .map(|e| ((e.a2 - e.a1) - (e.b2 - e.b1)) / 2.0)
            .collect();
        let latency3 = exchanges
            .iter()
            .map(|e| ((e.b3 - e.b2) - (e.a3 - e.a2)) / 2.0)
            .collect();
        let offset1 = exchanges
            .iter()
            .map(|e| ((e.a1 - e.b1) + (e.a2 - e.b2)) / 2.0)
            .collect();
        let offset3 = exchanges
            .iter()
            .map(|e| ((e.a2 - e.b2) + (e.a3 - e.b3)) / 2.0)
            .collect();

        let mut stats = Self {
            station_id,
            latency1,
            latency3,
            offset1,
            offset3,
            best_latency_index: None,
        };
        stats.best_latency_index = stats.find_best_latency_index();
        stats
    }

    /// Compute estimates from six column arrays
    ///
    /// # Errors
    /// The columns do not all have the same length.
    pub fn from_columns(
        station_id: StationId,
        a1: &[f64],
        a2: &[f64],
        a3: &[f64],
        b1: &[f64],
        b2: &[f64],
        b3: &[f64],
    ) -> Result<Self, ContractError> {
        let lengths = [a1.len(), a2.len(), a3.len(), b1.len(), b2.len(), b3.len()];
        if lengths.iter().any(|&len| len != lengths[0]) {
            return Err(ContractError::ExchangeShape { lengths });
        }
        let exchanges: Vec<TimeSyncExchange> = (0..lengths[0])
            .map(|i| TimeSyncExchange::from_array([a1[i], a2[i], a3[i], b1[i], b2[i], b3[i]]))
            .collect();
        Ok(Self::new(station_id, &exchanges))
    }

    /// Station the exchanges belong to
    pub fn station_id(&self) -> &StationId {
        &self.station_id
    }

    /// Number of exchanges
    #[inline]
    pub fn num_tri_messages(&self) -> usize {
        self.latency1.len()
    }

    pub fn latency1(&self) -> &[f64] {
        &self.latency1
    }

    pub fn latency3(&self) -> &[f64] {
        &self.latency3
    }

    pub fn offset1(&self) -> &[f64] {
        &self.offset1
    }

    pub fn offset3(&self) -> &[f64] {
        &self.offset3
    }

    /// Both latency estimates of every exchange, leg 1 first
    pub fn all_latencies(&self) -> impl Iterator<Item = f64> + '_ {
        self.latency1.iter().chain(self.latency3.iter()).copied()
    }

    /// Both offset estimates of every exchange, leg 1 first
    pub fn all_offsets(&self) -> impl Iterator<Item = f64> + '_ {
        self.offset1.iter().chain(self.offset3.iter()).copied()
    }

    /// Combined latency `(latency1 + latency3) / 2` of one exchange
    pub fn combined_latency(&self, index: usize) -> Option<f64> {
        Some((self.latency1.get(index)? + self.latency3.get(index)?) / 2.0)
    }

    /// Combined offset `(offset1 + offset3) / 2` of one exchange
    pub fn combined_offset(&self, index: usize) -> Option<f64> {
        Some((self.offset1.get(index)? + self.offset3.get(index)?) / 2.0)
    }

    /// Index of the exchange with the lowest combined latency
    ///
    /// None when there are no exchanges or every estimate is NaN.
    #[inline]
    pub fn best_latency_index(&self) -> Option<usize> {
        self.best_latency_index
    }

    /// Combined latency at the best index
    pub fn best_latency(&self) -> Option<f64> {
        self.best_latency_index
            .and_then(|i| self.combined_latency(i))
    }

    /// Combined offset at the best index
    pub fn best_offset(&self) -> Option<f64> {
        self.best_latency_index.and_then(|i| self.combined_offset(i))
    }

    fn is_valid_exchange(&self, index: usize) -> bool {
        let l1 = self.latency1[index];
        let l3 = self.latency3[index];
        l1.is_finite() && l3.is_finite() && l1 >= 0.0 && l3 >= 0.0
    }

    /// Argmin over valid exchanges, falling back to any finite one
    ///
    /// Ties keep the first occurrence.
    fn find_best_latency_index(&self) -> Option<usize> {
        let argmin = |accept: &dyn Fn(usize) -> bool| {
            let mut best: Option<(usize, f64)> = None;
            for index in 0..self.num_tri_messages() {
                if !accept(index) {
                    continue;
                }
                let Some(latency) = self.combined_latency(index) else {
                    continue;
                };
                if !latency.is_finite() {
                    continue;
                }
                if best.map_or(true, |(_, current)| latency < current) {
                    best = Some((index, latency));
                }
            }
            best.map(|(index, _)| index)
        };

        argmin(&|index| self.is_valid_exchange(index)).or_else(|| {
            tracing::debug!(
                station_id = %self.station_id,
                "no exchange with non-negative latency, using smallest finite latency"
            );
            argmin(&|_| true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Exchange with one-way delay `d` and station clock behind the server by `offset`
    fn exchange(start: f64, d: f64, offset: f64) -> TimeSyncExchange {
        let a1 = start;
        let b1 = a1 + d - offset;
        let b2 = b1 + 50.0;
        let a2 = b2 + offset + d;
        let a3 = a2 + 50.0;
        let b3 = a3 + d - offset;
        TimeSyncExchange {
            a1,
            a2,
            a3,
            b1,
            b2,
            b3,
        }
    }

    #[test]
    fn test_constant_delay_and_offset_recovered() {
        let d = 1_500.0;
        let offset = 42_000.0;
        let exchanges: Vec<_> = (0..5)
            .map(|i| exchange(1.0e15 + i as f64 * 1.0e6, d, offset))
            .collect();
        let stats = TriMessageStats::new("s".into(), &exchanges);

        assert_eq!(stats.num_tri_messages(), 5);
        for latency in stats.all_latencies() {
            assert!((latency - d).abs() < 1e-3);
        }
        for o in stats.all_offsets() {
            assert!((o - offset).abs() < 1e-3);
        }
        assert_eq!(stats.best_latency_index(), Some(0));
        assert!((stats.best_offset().unwrap() - offset).abs() < 1e-3);
    }

    #[test]
    fn test_best_index_is_minimum_combined_latency() {
        let exchanges = vec![
            exchange(0.0, 3_000.0, 10.0),
            exchange(1.0e6, 1_000.0, 20.0),
            exchange(2.0e6, 1_000.0, 30.0),
            exchange(3.0e6, 2_000.0, 40.0),
        ];
        let stats = TriMessageStats::new("s".into(), &exchanges);
        // tie between 1 and 2 keeps the first
        assert_eq!(stats.best_latency_index(), Some(1));
        assert!((stats.best_latency().unwrap() - 1_000.0).abs() < 1e-6);
        assert!((stats.best_offset().unwrap() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_and_nan_latencies_not_selected() {
        let mut bad = exchange(0.0, 1_000.0, 0.0);
        // station reply arrives before it was sent
        bad.a2 = bad.a1 - 10_000.0;
        let mut nan = exchange(1.0e6, 500.0, 0.0);
        nan.b2 = f64::NAN;
        let good = exchange(2.0e6, 2_000.0, 0.0);

        let stats = TriMessageStats::new("s".into(), &[bad, nan, good]);
        assert_eq!(stats.best_latency_index(), Some(2));
    }

    #[test]
    fn test_all_invalid_falls_back_to_finite_minimum() {
        let mut first = exchange(0.0, 1_000.0, 0.0);
        first.a2 = first.a1 - 10_000.0;
        let mut second = exchange(1.0e6, 1_000.0, 0.0);
        second.a2 = second.a1 - 20_000.0;

        let stats = TriMessageStats::new("s".into(), &[first, second]);
        assert_eq!(stats.best_latency_index(), Some(1));
    }

    #[test]
    fn test_all_nan_has_no_best() {
        let mut e = exchange(0.0, 1_000.0, 0.0);
        e.a1 = f64::NAN;
        let stats = TriMessageStats::new("s".into(), &[e]);
        assert_eq!(stats.best_latency_index(), None);
        assert_eq!(stats.best_latency(), None);
    }

    #[test]
    fn test_no_exchanges() {
        let stats = TriMessageStats::new("s".into(), &[]);
        assert_eq!(stats.num_tri_messages(), 0);
        assert!(stats.latency1().is_empty());
        assert_eq!(stats.best_latency_index(), None);
        assert_eq!(stats.best_offset(), None);
    }

    #[test]
    fn test_from_columns_shape_checked() {
        let result = TriMessageStats::from_columns(
            "s".into(),
            &[1.0],
            &[2.0],
            &[3.0],
            &[1.0],
            &[2.0],
            &[],
        );
        assert!(matches!(
            result,
            Err(ContractError::ExchangeShape {
                lengths: [1, 1, 1, 1, 1, 0]
            })
        ));
    }

    #[test]
    fn test_from_columns_matches_new() {
        let e = exchange(0.0, 800.0, -300.0);
        let from_columns = TriMessageStats::from_columns(
            "s".into(),
            &[e.a1],
            &[e.a2],
            &[e.a3],
            &[e.b1],
            &[e.b2],
            &[e.b3],
        )
        .unwrap();
        assert_eq!(from_columns, TriMessageStats::new("s".into(), &[e]));
    }
}
