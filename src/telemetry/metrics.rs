// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-process latency aggregation.
//!
//! [`LatencyMetrics`] is a [`Metrics`] collaborator that keeps running
//! statistics per `export.method` instead of publishing each reading.
//! Suitable for CLI tools where full observability stacks are overkill.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

use super::collaborators::Metrics;
use crate::error::TelemetryError;
use crate::types::{Gauge, TargetDescriptor};

/// Process-wide latency aggregator.
pub static GLOBAL_LATENCY: Lazy<Arc<LatencyMetrics>> = Lazy::new(|| Arc::new(LatencyMetrics::new()));

/// Shared handle to [`GLOBAL_LATENCY`], ready to put in a telemetry bundle.
pub fn global() -> Arc<LatencyMetrics> {
    Arc::clone(&GLOBAL_LATENCY)
}

/// Latency statistics keyed by operation.
#[derive(Debug)]
pub struct LatencyMetrics {
    operations: RwLock<HashMap<String, OperationMetrics>>,

    /// Start time for calculating uptime.
    start_time: Instant,
}

impl LatencyMetrics {
    pub fn new() -> Self {
        Self {
            operations: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record one call of `name`.
    pub fn record(&self, name: &str, duration: Duration) {
        let mut ops = self
            .operations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        ops.entry(name.to_string())
            .or_insert_with(OperationMetrics::new)
            .record(duration);
    }

    /// Get metrics for a specific operation.
    pub fn operation_metrics(&self, name: &str) -> Option<OperationMetrics> {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Get uptime since metrics were initialized.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Take a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let operations = self
            .operations
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        MetricsSnapshot {
            operations: operations.clone(),
            uptime: self.uptime(),
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        self.operations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for LatencyMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics for LatencyMetrics {
    fn gauge(&self, name: &str, gauge: Gauge) -> Result<(), TelemetryError> {
        let seconds = match gauge.unit.as_str() {
            "ms" => gauge.value / 1_000.0,
            "s" => gauge.value,
            "us" | "µs" => gauge.value / 1_000_000.0,
            other => {
                return Err(TelemetryError::emit(
                    "metrics",
                    format!("unsupported unit for {name}: {other}"),
                ))
            }
        };
        let duration = Duration::try_from_secs_f64(seconds)
            .map_err(|err| TelemetryError::emit("metrics", format!("{name}: {err}")))?;

        let key = gauge
            .metadata
            .get("target")
            .and_then(|target| serde_json::from_value::<TargetDescriptor>(target.clone()).ok())
            .map(|target| target.qualified_name())
            .unwrap_or_else(|| name.to_string());

        self.record(&key, duration);
        Ok(())
    }
}

/// Latency statistics with histogram.
#[derive(Debug, Clone)]
pub struct OperationMetrics {
    /// Number of calls.
    pub count: u64,

    /// Total duration.
    pub total_duration: Duration,

    /// Minimum duration.
    pub min_duration: Duration,

    /// Maximum duration.
    pub max_duration: Duration,

    /// Histogram buckets for latency distribution.
    pub histogram: Histogram,
}

impl OperationMetrics {
    pub fn new() -> Self {
        Self {
            count: 0,
            total_duration: Duration::ZERO,
            min_duration: Duration::MAX,
            max_duration: Duration::ZERO,
            histogram: Histogram::default(),
        }
    }

    /// Record a call.
    pub fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total_duration += duration;
        self.min_duration = self.min_duration.min(duration);
        self.max_duration = self.max_duration.max(duration);
        self.histogram.record(duration);
    }

    /// Calculate average duration.
    pub fn avg_duration(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total_duration / u32::try_from(self.count).unwrap_or(u32::MAX)
        }
    }
}

impl Default for OperationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple histogram with fixed buckets for latency tracking.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Bucket boundaries in microseconds.
    /// Default: [100us, 1ms, 10ms, 100ms, 1s, 10s, +inf]
    buckets: Vec<u64>,

    /// Count per bucket.
    counts: Vec<u64>,
}

impl Histogram {
    /// Create a histogram with custom bucket boundaries (in microseconds).
    pub fn with_buckets(buckets: Vec<u64>) -> Self {
        let counts = vec![0; buckets.len() + 1];
        Self { buckets, counts }
    }

    /// Record a duration value.
    pub fn record(&mut self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        let bucket_idx = self
            .buckets
            .iter()
            .position(|&b| micros <= b)
            .unwrap_or(self.buckets.len());
        if let Some(count) = self.counts.get_mut(bucket_idx) {
            *count += 1;
        }
    }

    /// Get counts for each bucket.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Get bucket boundaries.
    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    /// Calculate approximate percentile (p50, p90, p99, etc.).
    pub fn percentile(&self, p: f64) -> Duration {
        let total: u64 = self.counts.iter().sum();
        if total == 0 {
            return Duration::ZERO;
        }

        let target = (total as f64 * p / 100.0).ceil() as u64;
        let mut cumulative = 0u64;

        for (i, &count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                // Overflow bucket reports ten times the last boundary
                let micros = match self.buckets.get(i) {
                    Some(&boundary) => boundary,
                    None => self.buckets.last().copied().unwrap_or(0) * 10,
                };
                return Duration::from_micros(micros);
            }
        }

        Duration::ZERO
    }

    /// Get p50 (median) latency.
    pub fn p50(&self) -> Duration {
        self.percentile(50.0)
    }

    /// Get p90 latency.
    pub fn p90(&self) -> Duration {
        self.percentile(90.0)
    }

    /// Get p99 latency.
    pub fn p99(&self) -> Duration {
        self.percentile(99.0)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // 100us, 1ms, 10ms, 100ms, 1s, 10s
        Self::with_buckets(vec![100, 1_000, 10_000, 100_000, 1_000_000, 10_000_000])
    }
}

/// A snapshot of all metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Operation metrics by `export.method`.
    pub operations: HashMap<String, OperationMetrics>,

    /// Uptime when snapshot was taken.
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Format as a human-readable report.
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Latency Report ===\n\n");
        report.push_str(&format!("Uptime: {:.2?}\n\n", self.uptime));

        let mut names: Vec<&String> = self.operations.keys().collect();
        names.sort();

        for name in names {
            let Some(metrics) = self.operations.get(name) else {
                continue;
            };
            report.push_str(&format!(
                "  {}: {} calls, avg {:.2?}, max {:.2?}, p99 {:.2?}\n",
                name,
                metrics.count,
                metrics.avg_duration(),
                metrics.max_duration,
                metrics.histogram.p99()
            ));
        }

        report
    }
}
