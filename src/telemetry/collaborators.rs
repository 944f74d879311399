// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Contracts for the log, metric, and trace collaborators.
//!
//! The instrumentor only talks to these traits. Each collaborator is optional
//! in a [`Telemetry`] bundle; an absent collaborator means the matching
//! side effect is skipped entirely.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TelemetryError;
use crate::types::{Gauge, LogLevel, Metadata};

/// Structured log sink.
#[cfg_attr(test, mockall::automock)]
pub trait Logs: Send + Sync {
    /// Emit one event made of `base` and `extra` merged together.
    fn log(
        &self,
        level: LogLevel,
        message: &str,
        base: &Metadata,
        extra: Metadata,
    ) -> Result<(), TelemetryError>;
}

/// Metric recorder.
#[cfg_attr(test, mockall::automock)]
pub trait Metrics: Send + Sync {
    /// Emit a gauge reading.
    fn gauge(&self, name: &str, gauge: Gauge) -> Result<(), TelemetryError>;
}

/// One traced operation.
#[cfg_attr(test, mockall::automock)]
pub trait TraceSpan: Send + Sync {
    /// Open a span under this one. Tags start empty, baggage is inherited.
    fn child_span(&self, name: &str) -> Result<Box<dyn TraceSpan>, TelemetryError>;

    /// Attach a tag.
    fn tag(&self, key: &str, value: Value) -> Result<(), TelemetryError>;

    /// Close the span.
    fn finish(&self) -> Result<(), TelemetryError>;
}

/// Source of root spans.
///
/// Instrumented methods never open root spans; they only check that tracing
/// is configured and then descend from the caller's parent span.
pub trait Tracer: Send + Sync {
    fn trace(&self, name: &str, tags: Metadata, baggage: Metadata) -> Arc<dyn TraceSpan>;
}

/// What to do when a collaborator fails to emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort the call with the telemetry error.
    #[default]
    Propagate,
    /// Report the failure through `tracing` and carry on.
    Isolate,
}

/// The collaborators available to instrumented methods.
#[derive(Clone, Default)]
pub struct Telemetry {
    pub logs: Option<Arc<dyn Logs>>,
    pub metrics: Option<Arc<dyn Metrics>>,
    pub tracing: Option<Arc<dyn Tracer>>,
    pub failure_policy: FailurePolicy,
}

impl Telemetry {
    /// A bundle with no collaborators.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logs(mut self, logs: Arc<dyn Logs>) -> Self {
        self.logs = Some(logs);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_tracing(mut self, tracing: Arc<dyn Tracer>) -> Self {
        self.tracing = Some(tracing);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Check whether any collaborator is configured.
    pub fn is_empty(&self) -> bool {
        self.logs.is_none() && self.metrics.is_none() && self.tracing.is_none()
    }
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("logs", &self.logs.is_some())
            .field("metrics", &self.metrics.is_some())
            .field("tracing", &self.tracing.is_some())
            .field("failure_policy", &self.failure_policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_default_is_empty() {
        let telemetry = Telemetry::new();
        assert!(telemetry.is_empty());
        assert_eq!(telemetry.failure_policy, FailurePolicy::Propagate);
    }

    #[test]
    fn test_telemetry_builder() {
        let telemetry = Telemetry::new()
            .with_logs(Arc::new(MockLogs::new()))
            .with_metrics(Arc::new(MockMetrics::new()))
            .with_failure_policy(FailurePolicy::Isolate);

        assert!(!telemetry.is_empty());
        assert!(telemetry.tracing.is_none());
        let debug = format!("{:?}", telemetry);
        assert!(debug.contains("logs: true"));
        assert!(debug.contains("tracing: false"));
        assert!(debug.contains("Isolate"));
    }

    #[test]
    fn test_failure_policy_serde() {
        let policy: FailurePolicy = serde_json::from_str("\"isolate\"").unwrap();
        assert_eq!(policy, FailurePolicy::Isolate);
        assert_eq!(
            serde_json::to_string(&FailurePolicy::Propagate).unwrap(),
            "\"propagate\""
        );
    }
}
