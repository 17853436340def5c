// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Thread-safe counters, per-command durations, and session gauges. One
//! `RwLock` guards the whole sink; handlers never hold it across anything
//! that could block.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;

/// Rolling window size for per-command-type duration samples.
const DURATION_WINDOW: usize = 100;

struct Inner {
    command_counts: HashMap<String, u64>,
    error_counts: HashMap<String, u64>,
    current_sessions: usize,
    max_sessions_seen: usize,
    durations: HashMap<String, VecDeque<Duration>>,
    counters: HashMap<String, u64>,
}

pub struct MetricsSink {
    inner: RwLock<Inner>,
}

/// Computed min/mean/max and tail percentiles for one command type's
/// rolling duration window.
#[derive(Debug, Clone, Serialize)]
pub struct DurationStats {
    pub count: usize,
    pub min_ms: f64,
    pub mean_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

/// Point-in-time snapshot returned by [`MetricsSink::get_metrics`].
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub command_counts: HashMap<String, u64>,
    pub error_counts: HashMap<String, u64>,
    pub current_sessions: usize,
    pub max_sessions_seen: usize,
    pub durations: HashMap<String, DurationStats>,
    pub counters: HashMap<String, u64>,
}

impl Default for MetricsSink {
    fn default() -> Self {
        MetricsSink {
            inner: RwLock::new(Inner {
                command_counts: HashMap::new(),
                error_counts: HashMap::new(),
                current_sessions: 0,
                max_sessions_seen: 0,
                durations: HashMap::new(),
                counters: HashMap::new(),
            }),
        }
    }
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_command(&self, command_type: &str) {
        *self
            .inner
            .write()
            .command_counts
            .entry(command_type.to_string())
            .or_insert(0) += 1;
    }

    pub fn record_error(&self, command_type: &str) {
        *self
            .inner
            .write()
            .error_counts
            .entry(command_type.to_string())
            .or_insert(0) += 1;
    }

    /// Pushes `duration` onto the command type's window, evicting the
    /// oldest sample once the window exceeds [`DURATION_WINDOW`].
    pub fn record_duration(&self, command_type: &str, duration: Duration) {
        let mut inner = self.inner.write();
        let window = inner
            .durations
            .entry(command_type.to_string())
            .or_insert_with(VecDeque::new);
        window.push_back(duration);
        if window.len() > DURATION_WINDOW {
            window.pop_front();
        }
    }

    pub fn set_current_sessions(&self, count: usize) {
        let mut inner = self.inner.write();
        inner.current_sessions = count;
        if count > inner.max_sessions_seen {
            inner.max_sessions_seen = count;
        }
    }

    /// `name` may carry a `{tag}` suffix (e.g. `events.dropped{type=...}`);
    /// it is stored verbatim as the counter key, matching the emitter's
    /// arbitrary-labeled-counter usage.
    pub fn increment_counter(&self, name: &str) {
        *self.inner.write().counters.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        let inner = self.inner.read();
        let durations = inner
            .durations
            .iter()
            .map(|(command_type, window)| (command_type.clone(), summarize(window)))
            .collect();
        MetricsSnapshot {
            command_counts: inner.command_counts.clone(),
            error_counts: inner.error_counts.clone(),
            current_sessions: inner.current_sessions,
            max_sessions_seen: inner.max_sessions_seen,
            durations,
            counters: inner.counters.clone(),
        }
    }
}

fn summarize(window: &VecDeque<Duration>) -> DurationStats {
    let mut millis: Vec<f64> = window.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
    millis.sort_by(|a, b| a.partial_cmp(b).expect("duration millis are never NaN"));

    let count = millis.len();
    if count == 0 {
        return DurationStats {
            count: 0,
            min_ms: 0.0,
            mean_ms: 0.0,
            max_ms: 0.0,
            p50_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
        };
    }

    let sum: f64 = millis.iter().sum();
    DurationStats {
        count,
        min_ms: millis[0],
        mean_ms: sum / count as f64,
        max_ms: millis[count - 1],
        p50_ms: percentile(&millis, 0.50),
        p95_ms: percentile(&millis, 0.95),
        p99_ms: percentile(&millis, 0.99),
    }
}

/// Nearest-rank percentile over an already-sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
