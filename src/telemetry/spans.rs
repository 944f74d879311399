// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Trace spans backed by the `tracing` crate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{field, info_span, Span};

use super::collaborators::{TraceSpan, Tracer};
use crate::error::TelemetryError;
use crate::types::Metadata;

/// [`Tracer`] whose spans are `tracing` spans.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTracer;

impl TracingTracer {
    pub fn new() -> Self {
        Self
    }
}

impl TracingTracer {
    /// Open a root span, keeping its concrete type.
    pub fn root(&self, name: &str, tags: Metadata, baggage: Metadata) -> Arc<TracingSpan> {
        let span = info_span!(
            "trace",
            operation = %name,
            error = field::Empty,
            duration_ms = field::Empty,
        );
        let root = TracingSpan::wrap(name, span, baggage);
        for (key, value) in tags {
            root.record_tag(&key, &value);
        }
        Arc::new(root)
    }
}

impl Tracer for TracingTracer {
    fn trace(&self, name: &str, tags: Metadata, baggage: Metadata) -> Arc<dyn TraceSpan> {
        self.root(name, tags, baggage)
    }
}

/// A `tracing` span with tag and finish support.
///
/// `error` is a declared span field; other tags become events inside the span.
#[derive(Debug)]
pub struct TracingSpan {
    name: String,
    span: Span,
    baggage: Metadata,
    start: Instant,
    finished: AtomicBool,
}

impl TracingSpan {
    fn wrap(name: &str, span: Span, baggage: Metadata) -> Self {
        Self {
            name: name.to_string(),
            span,
            baggage,
            start: Instant::now(),
            finished: AtomicBool::new(false),
        }
    }

    pub fn baggage(&self) -> &Metadata {
        &self.baggage
    }

    fn record_tag(&self, key: &str, value: &Value) {
        if key == "error" {
            self.span.record("error", value.as_bool().unwrap_or(true));
        } else {
            tracing::debug!(parent: &self.span, tag = %key, value = %value, "span tagged");
        }
    }
}

impl TraceSpan for TracingSpan {
    fn child_span(&self, name: &str) -> Result<Box<dyn TraceSpan>, TelemetryError> {
        let span = info_span!(
            parent: &self.span,
            "span",
            operation = %name,
            error = field::Empty,
            duration_ms = field::Empty,
        );
        Ok(Box::new(Self::wrap(name, span, self.baggage.clone())))
    }

    fn tag(&self, key: &str, value: Value) -> Result<(), TelemetryError> {
        if self.finished.load(Ordering::Acquire) {
            return Err(TelemetryError::SpanFinished(self.name.clone()));
        }
        self.record_tag(key, &value);
        Ok(())
    }

    fn finish(&self) -> Result<(), TelemetryError> {
        if self.finished.swap(true, Ordering::AcqRel) {
            return Err(TelemetryError::SpanFinished(self.name.clone()));
        }
        let duration_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        self.span.record("duration_ms", duration_ms);
        tracing::debug!(parent: &self.span, "span finished");
        Ok(())
    }
}
