use crate::Category;
use dashmap::DashMap;
use metrics::{histogram, increment_counter};
use std::time::{Duration, Instant};
use tracing::info;

/// Per-category probe counters for one analysis run.
///
/// Every recording is also forwarded to the `metrics` facade, so an installed
/// recorder sees `probe_completed_total`, `probe_failed_total` and
/// `probe_duration_seconds` labelled by category. Without a recorder the
/// facade calls are no-ops and only the in-process snapshot remains.
pub struct ProbeMetrics {
    categories: DashMap<Category, CategoryStats>,
    started: Instant,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryStats {
    pub succeeded: u64,
    pub failed: u64,
    pub total_duration: Duration,
    pub max_duration: Duration,
}

impl CategoryStats {
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed
    }

    pub fn average_duration(&self) -> Duration {
        match self.total() {
            0 => Duration::ZERO,
            n => self.total_duration / n as u32,
        }
    }
}

impl ProbeMetrics {
    pub fn new() -> Self {
        Self {
            categories: DashMap::new(),
            started: Instant::now(),
        }
    }

    pub fn record_probe(&self, category: Category, duration: Duration, success: bool) {
        let label = category.as_str();
        if success {
            increment_counter!("probe_completed_total", "category" => label);
        } else {
            increment_counter!("probe_failed_total", "category" => label);
        }
        histogram!("probe_duration_seconds", duration.as_secs_f64(), "category" => label);

        let mut stats = self.categories.entry(category).or_default();
        if success {
            stats.succeeded += 1;
        } else {
            stats.failed += 1;
        }
        stats.total_duration += duration;
        stats.max_duration = stats.max_duration.max(duration);
    }

    pub fn category(&self, category: Category) -> CategoryStats {
        self.categories
            .get(&category)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut categories: Vec<(Category, CategoryStats)> = self
            .categories
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        categories.sort_by_key(|(category, _)| *category);

        MetricsSnapshot {
            probes_succeeded: categories.iter().map(|(_, s)| s.succeeded).sum(),
            probes_failed: categories.iter().map(|(_, s)| s.failed).sum(),
            categories,
            uptime: self.started.elapsed(),
        }
    }

    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        info!(
            "Probe summary: {} succeeded, {} failed in {}",
            snapshot.probes_succeeded,
            snapshot.probes_failed,
            crate::utils::format_duration(snapshot.uptime)
        );
        for (category, stats) in &snapshot.categories {
            info!(
                "  {}: {}/{} ok, avg {:?}, max {:?}",
                category,
                stats.succeeded,
                stats.total(),
                stats.average_duration(),
                stats.max_duration
            );
        }
    }
}

impl Default for ProbeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub probes_succeeded: u64,
    pub probes_failed: u64,
    pub categories: Vec<(Category, CategoryStats)>,
    pub uptime: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_probe() {
        let metrics = ProbeMetrics::new();
        metrics.record_probe(Category::Content, Duration::from_millis(100), true);
        metrics.record_probe(Category::Content, Duration::from_millis(300), false);
        metrics.record_probe(Category::Security, Duration::from_millis(50), true);

        let content = metrics.category(Category::Content);
        assert_eq!(content.succeeded, 1);
        assert_eq!(content.failed, 1);
        assert_eq!(content.average_duration(), Duration::from_millis(200));
        assert_eq!(content.max_duration, Duration::from_millis(300));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.probes_succeeded, 2);
        assert_eq!(snapshot.probes_failed, 1);
        assert_eq!(snapshot.categories.len(), 2);
        assert_eq!(snapshot.categories[0].0, Category::Content);
    }

    #[test]
    fn test_unknown_category_is_empty() {
        let metrics = ProbeMetrics::default();
        let stats = metrics.category(Category::Mobile);
        assert_eq!(stats.total(), 0);
        assert_eq!(stats.average_duration(), Duration::ZERO);
    }
}
