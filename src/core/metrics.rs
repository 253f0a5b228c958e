//! Metrics sinks the executor reports task counters and timings into.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Counter: task finished with a success.
pub const TASKS_SUCCESS: &str = "tasks.success";
/// Counter: task exhausted its retries.
pub const TASKS_FAILURE: &str = "tasks.failure";
/// Counter: task exceeded its wall-clock budget.
pub const TASKS_TIMEOUT: &str = "tasks.timeout";
/// Counter: retry scheduled after a failed attempt.
pub const TASKS_RETRIES: &str = "tasks.retries";
/// Timing: wall-clock duration of a task from dispatch to outcome.
pub const TASKS_DURATION_MS: &str = "tasks.duration_ms";

/// Write-only sink for counters and timing observations.
///
/// Implementations are called concurrently from every worker.
pub trait MetricsSink: Send + Sync {
    /// Add `value` to the counter `key`.
    fn increment(&self, key: &str, value: u64);
    /// Record one observation for the timing `key`.
    fn observe(&self, key: &str, value: f64);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment(&self, _key: &str, _value: u64) {}

    fn observe(&self, _key: &str, _value: f64) {}
}

/// Aggregated view of one timing series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    /// Number of observations.
    pub count: usize,
    /// Mean of the observations.
    pub avg: f64,
    /// Largest observation.
    pub max: f64,
}

/// Point-in-time copy of all metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Counter values by key.
    pub counters: BTreeMap<String, u64>,
    /// Timing summaries by key.
    pub timings: BTreeMap<String, TimingSummary>,
}

/// Running aggregate of one timing series; constant size however many
/// observations it absorbs.
#[derive(Debug, Clone, Copy, Default)]
struct TimingAggregate {
    count: usize,
    sum: f64,
    max: f64,
}

impl TimingAggregate {
    fn add(&mut self, value: f64) {
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.count += 1;
        self.sum += value;
    }

    fn summary(self) -> TimingSummary {
        #[allow(clippy::cast_precision_loss)]
        let avg = if self.count == 0 { 0.0 } else { self.sum / self.count as f64 };
        TimingSummary {
            count: self.count,
            avg,
            max: self.max,
        }
    }
}

#[derive(Default)]
struct MetricsState {
    counters: HashMap<String, u64>,
    timings: HashMap<String, TimingAggregate>,
}

/// Thread-safe in-memory metrics collector.
///
/// Timings are kept as running count/sum/max aggregates, never as raw
/// observations.
#[derive(Default)]
pub struct InMemoryMetrics {
    state: Mutex<MetricsState>,
}

impl InMemoryMetrics {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter (0 if never incremented).
    #[must_use]
    pub fn counter(&self, key: &str) -> u64 {
        self.state.lock().counters.get(key).copied().unwrap_or(0)
    }

    /// Summary of one timing series, if anything was observed for it.
    #[must_use]
    pub fn timing(&self, key: &str) -> Option<TimingSummary> {
        self.state.lock().timings.get(key).map(|agg| agg.summary())
    }

    /// Copy out counters and timing summaries.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.lock();
        let counters = state
            .counters
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        let timings = state
            .timings
            .iter()
            .map(|(k, agg)| (k.clone(), agg.summary()))
            .collect();
        MetricsSnapshot { counters, timings }
    }
}

impl MetricsSink for InMemoryMetrics {
    fn increment(&self, key: &str, value: u64) {
        let mut state = self.state.lock();
        *state.counters.entry(key.to_owned()).or_insert(0) += value;
    }

    fn observe(&self, key: &str, value: f64) {
        self.state
            .lock()
            .timings
            .entry(key.to_owned())
            .or_default()
            .add(value);
    }
}

impl std::fmt::Debug for InMemoryMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMetrics")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
