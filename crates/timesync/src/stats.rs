//! Weighted mean/std aggregation over per-packet statistics.

/// One group's mean, std and sample count
#[derive(Debug, Clone, Copy, PartialEq)]
struct GroupStats {
    mean: f64,
    std_dev: f64,
    count: usize,
}

/// Combines per-group (mean, std, count) triples into overall statistics
///
/// Groups with no samples or an undefined mean are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsContainer {
    name: String,
    groups: Vec<GroupStats>,
}

impl StatsContainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add one group
    pub fn add(&mut self, mean: Option<f64>, std_dev: Option<f64>, count: usize) {
        let Some(mean) = mean.filter(|m| m.is_finite()) else {
            return;
        };
        if count == 0 {
            return;
        }
        let std_dev = std_dev.filter(|s| s.is_finite()).unwrap_or(0.0);
        self.groups.push(GroupStats {
            mean,
            std_dev,
            count,
        });
    }

    /// Number of groups that contributed
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn total_count(&self) -> f64 {
        self.groups.iter().map(|g| g.count as f64).sum()
    }

    /// Count-weighted mean of the group means
    pub fn mean_of_means(&self) -> Option<f64> {
        if self.groups.is_empty() {
            return None;
        }
        let weighted: f64 = self.groups.iter().map(|g| g.mean * g.count as f64).sum();
        Some(weighted / self.total_count())
    }

    /// Standard deviation of the union of all groups
    ///
    /// `sqrt(Σ nᵢ(σᵢ² + (μᵢ − μ)²) / Σ nᵢ)`
    pub fn total_std_dev(&self) -> Option<f64> {
        let mean = self.mean_of_means()?;
        let sum: f64 = self
            .groups
            .iter()
            .map(|g| g.count as f64 * (g.std_dev.powi(2) + (g.mean - mean).powi(2)))
            .sum();
        Some((sum / self.total_count()).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population_stats(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, var.sqrt())
    }

    #[test]
    fn test_empty_container() {
        let stats = StatsContainer::new("latency");
        assert_eq!(stats.mean_of_means(), None);
        assert_eq!(stats.total_std_dev(), None);
    }

    #[test]
    fn test_matches_pooled_population_stats() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [10.0, 12.0];
        let (ma, sa) = population_stats(&a);
        let (mb, sb) = population_stats(&b);

        let mut stats = StatsContainer::new("latency");
        stats.add(Some(ma), Some(sa), a.len());
        stats.add(Some(mb), Some(sb), b.len());

        let all: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
        let (m, s) = population_stats(&all);
        assert!((stats.mean_of_means().unwrap() - m).abs() < 1e-12);
        assert!((stats.total_std_dev().unwrap() - s).abs() < 1e-12);
    }

    #[test]
    fn test_skips_empty_and_undefined_groups() {
        let mut stats = StatsContainer::new("offset");
        stats.add(Some(5.0), Some(1.0), 4);
        stats.add(None, None, 0);
        stats.add(Some(f64::NAN), Some(f64::NAN), 6);
        stats.add(Some(100.0), Some(0.0), 0);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats.mean_of_means(), Some(5.0));
        assert_eq!(stats.total_std_dev(), Some(1.0));
    }
}
