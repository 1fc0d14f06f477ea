//! Lightweight latency tracking for picker interactions.
//!
//! Keeps a bounded ring of recent measurements (search latency, selection)
//! and mirrors each one as a `tracing` debug event.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::time::Instant;

/// Number of metrics retained before the oldest are dropped.
const MAX_METRICS: usize = 100;

#[derive(Debug, Clone)]
pub struct PerfMetric {
    pub name: String,
    pub value: Duration,
    pub recorded_at: Instant,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSummary {
    pub count: usize,
    pub mean: Duration,
    pub max: Duration,
}

#[derive(Debug)]
pub struct PerfTracker {
    component: &'static str,
    enabled: bool,
    metrics: VecDeque<PerfMetric>,
    timers: HashMap<String, Instant>,
}

impl PerfTracker {
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            enabled: true,
            metrics: VecDeque::with_capacity(MAX_METRICS),
            timers: HashMap::new(),
        }
    }

    pub fn disabled(component: &'static str) -> Self {
        Self {
            enabled: false,
            ..Self::new(component)
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start (or restart) the named timer.
    pub fn start_timer(&mut self, name: &str) {
        if self.enabled {
            self.timers.insert(name.to_string(), Instant::now());
        }
    }

    pub fn is_timing(&self, name: &str) -> bool {
        self.timers.contains_key(name)
    }

    /// Stop the named timer and record its duration.
    ///
    /// Returns `None` if the timer was never started.
    pub fn end_timer(&mut self, name: &str, detail: Option<String>) -> Option<Duration> {
        let started = self.timers.remove(name)?;
        let elapsed = started.elapsed();
        self.record(name, elapsed, detail);
        Some(elapsed)
    }

    pub fn record(&mut self, name: &str, value: Duration, detail: Option<String>) {
        if !self.enabled {
            return;
        }

        tracing::debug!(
            component = self.component,
            metric = name,
            elapsed_ms = value.as_secs_f64() * 1000.0,
            detail = detail.as_deref().unwrap_or(""),
            "perf"
        );

        if self.metrics.len() == MAX_METRICS {
            self.metrics.pop_front();
        }
        self.metrics.push_back(PerfMetric {
            name: name.to_string(),
            value,
            recorded_at: Instant::now(),
            detail,
        });
    }

    /// Recorded metrics, oldest first, optionally filtered by name.
    pub fn metrics(&self, name: Option<&str>) -> Vec<&PerfMetric> {
        self.metrics
            .iter()
            .filter(|m| name.map_or(true, |n| m.name == n))
            .collect()
    }

    pub fn summary(&self, name: &str) -> Option<MetricSummary> {
        let values: Vec<Duration> = self
            .metrics
            .iter()
            .filter(|m| m.name == name)
            .map(|m| m.value)
            .collect();

        let count = values.len();
        if count == 0 {
            return None;
        }

        let total: Duration = values.iter().sum();
        Some(MetricSummary {
            count,
            mean: total / count as u32,
            max: values.iter().copied().max().unwrap_or_default(),
        })
    }

    pub fn clear(&mut self) {
        self.metrics.clear();
        self.timers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_records_elapsed() {
        let mut perf = PerfTracker::new("test");
        perf.start_timer("search");
        tokio::time::sleep(Duration::from_millis(250)).await;

        let elapsed = perf.end_timer("search", Some("acme".into())).unwrap();
        assert_eq!(elapsed, Duration::from_millis(250));
        assert_eq!(perf.metrics(Some("search"))[0].detail.as_deref(), Some("acme"));
        assert!(perf.end_timer("search", None).is_none());
    }

    #[test]
    fn test_ring_is_bounded() {
        let mut perf = PerfTracker::new("test");
        for i in 0..150u64 {
            perf.record("tick", Duration::from_millis(i), None);
        }
        let metrics = perf.metrics(None);
        assert_eq!(metrics.len(), MAX_METRICS);
        assert_eq!(metrics[0].value, Duration::from_millis(50));
    }

    #[test]
    fn test_summary() {
        let mut perf = PerfTracker::new("test");
        perf.record("select", Duration::from_millis(10), None);
        perf.record("select", Duration::from_millis(30), None);
        perf.record("search", Duration::from_millis(99), None);

        let summary = perf.summary("select").unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.mean, Duration::from_millis(20));
        assert_eq!(summary.max, Duration::from_millis(30));
        assert!(perf.summary("missing").is_none());
    }

    #[test]
    fn test_disabled_tracker_records_nothing() {
        let mut perf = PerfTracker::disabled("test");
        perf.start_timer("search");
        assert!(perf.end_timer("search", None).is_none());
        perf.record("search", Duration::from_millis(1), None);
        assert!(perf.metrics(None).is_empty());
    }
}
