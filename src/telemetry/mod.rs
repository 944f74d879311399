// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Telemetry collaborators and the backends shipped with the crate.
//!
//! - [`Logs`], [`Metrics`], [`Tracer`], [`TraceSpan`]: the contracts an
//!   instrumented method emits through, bundled in [`Telemetry`]
//! - [`events`]: collaborators publishing JSON events on a broadcast hub
//! - [`TracingLogs`], [`TracingTracer`]: collaborators backed by `tracing`
//! - [`LatencyMetrics`]: in-process latency aggregation
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dynamo_instrument::telemetry::{events::*, Telemetry};
//!
//! let hub = Arc::new(TelemetryEvents::for_crate());
//! let telemetry = Telemetry::new()
//!     .with_logs(Arc::new(EventLogs::new(hub.clone())))
//!     .with_metrics(Arc::new(EventMetrics::new(hub.clone())))
//!     .with_tracing(Arc::new(EventTracing::new(hub.clone())));
//!
//! let mut events = hub.subscribe();
//! ```

mod collaborators;
mod correlation;
pub mod events;
mod init;
mod logs;
pub mod metrics;
mod spans;

pub use collaborators::{FailurePolicy, Logs, Metrics, Telemetry, TraceSpan, Tracer};
#[cfg(test)]
pub use collaborators::{MockLogs, MockMetrics, MockTraceSpan};
pub use correlation::{SpanId, TraceId};
pub use init::{init_logging, LogConfig, LogGuard};
pub use logs::TracingLogs;
pub use metrics::{Histogram, LatencyMetrics, MetricsSnapshot, OperationMetrics, GLOBAL_LATENCY};
pub use spans::{TracingSpan, TracingTracer};
