// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Event-emitting collaborators.
//!
//! Every log line, gauge, and finished span becomes one JSON event published
//! on a [`TelemetryEvents`] hub. Listeners subscribe to the hub and receive
//! events in emission order.
//!
//! Event shapes:
//!
//! - log: `{type: "log", level, message, ...base, ...extra}`
//! - metric: `{type: "metric", target_type: "gauge", name, unit, value, ...metadata}`
//! - trace: `{type: "trace", traceId, spanId, parentId, name, tags, baggage, startTime, finishTime}`
//!
//! All events also carry `timestamp` and `provenance`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tokio::sync::broadcast;

use super::collaborators::{Logs, Metrics, TraceSpan, Tracer};
use super::correlation::{SpanId, TraceId};
use crate::error::TelemetryError;
use crate::metadata::deep_merge;
use crate::types::{Gauge, LogLevel, Metadata};

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast hub for telemetry events.
#[derive(Debug)]
pub struct TelemetryEvents {
    sender: broadcast::Sender<Value>,
    provenance: Value,
}

impl TelemetryEvents {
    /// Create a hub stamping events with the emitting package's name and version.
    pub fn new(package: &str, version: &str) -> Self {
        Self::with_capacity(package, version, DEFAULT_CAPACITY)
    }

    /// Create a hub with a custom per-subscriber buffer.
    pub fn with_capacity(package: &str, version: &str, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            provenance: json!({"module": package, "version": version}),
        }
    }

    /// Create a hub stamped with this crate's own name and version.
    pub fn for_crate() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), crate::VERSION)
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Stamp and publish an event, returning what was published.
    ///
    /// The hub's `timestamp` and `provenance` replace any carried by the event.
    /// Publishing with no subscribers is not an error; the event is dropped.
    pub fn emit(&self, mut event: Metadata) -> Value {
        event.insert("timestamp".to_string(), Value::String(rfc3339(Utc::now())));
        event.insert("provenance".to_string(), self.provenance.clone());

        let event = Value::Object(event);
        let _ = self.sender.send(event.clone());
        event
    }
}

fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// [`Logs`] implementation publishing `log` events.
#[derive(Debug, Clone)]
pub struct EventLogs {
    hub: Arc<TelemetryEvents>,
}

impl EventLogs {
    pub fn new(hub: Arc<TelemetryEvents>) -> Self {
        Self { hub }
    }
}

impl Logs for EventLogs {
    fn log(
        &self,
        level: LogLevel,
        message: &str,
        base: &Metadata,
        extra: Metadata,
    ) -> Result<(), TelemetryError> {
        let mut event = base.clone();
        deep_merge(&mut event, &extra);
        event.insert("type".to_string(), json!("log"));
        event.insert("level".to_string(), json!(level.as_str()));
        event.insert("message".to_string(), json!(message));

        self.hub.emit(event);
        Ok(())
    }
}

/// [`Metrics`] implementation publishing `metric` events.
#[derive(Debug, Clone)]
pub struct EventMetrics {
    hub: Arc<TelemetryEvents>,
}

impl EventMetrics {
    pub fn new(hub: Arc<TelemetryEvents>) -> Self {
        Self { hub }
    }
}

impl Metrics for EventMetrics {
    fn gauge(&self, name: &str, gauge: Gauge) -> Result<(), TelemetryError> {
        let mut event = gauge.metadata;
        event.insert("type".to_string(), json!("metric"));
        event.insert("target_type".to_string(), json!("gauge"));
        event.insert("name".to_string(), json!(name));
        event.insert("unit".to_string(), json!(gauge.unit));
        event.insert("value".to_string(), json!(gauge.value));

        self.hub.emit(event);
        Ok(())
    }
}

/// [`Tracer`] implementation whose spans publish `trace` events.
#[derive(Debug, Clone)]
pub struct EventTracing {
    hub: Arc<TelemetryEvents>,
}

impl EventTracing {
    pub fn new(hub: Arc<TelemetryEvents>) -> Self {
        Self { hub }
    }

    /// Open a root span, keeping its concrete type.
    pub fn root(&self, name: &str, tags: Metadata, baggage: Metadata) -> Arc<EventSpan> {
        Arc::new(EventSpan {
            hub: Arc::clone(&self.hub),
            name: name.to_string(),
            trace_id: TraceId::new(),
            span_id: SpanId::new(),
            parent_id: None,
            tags: Mutex::new(tags),
            baggage,
            start_time: Utc::now(),
            finished: AtomicBool::new(false),
        })
    }
}

impl Tracer for EventTracing {
    fn trace(&self, name: &str, tags: Metadata, baggage: Metadata) -> Arc<dyn TraceSpan> {
        self.root(name, tags, baggage)
    }
}

/// A span that publishes one `trace` event when finished.
#[derive(Debug)]
pub struct EventSpan {
    hub: Arc<TelemetryEvents>,
    name: String,
    trace_id: TraceId,
    span_id: SpanId,
    parent_id: Option<SpanId>,
    tags: Mutex<Metadata>,
    baggage: Metadata,
    start_time: DateTime<Utc>,
    finished: AtomicBool,
}

impl EventSpan {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    pub fn parent_id(&self) -> Option<SpanId> {
        self.parent_id
    }

    pub fn baggage(&self) -> &Metadata {
        &self.baggage
    }

    /// Snapshot of the current tags.
    pub fn tags(&self) -> Metadata {
        self.tags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

impl TraceSpan for EventSpan {
    fn child_span(&self, name: &str) -> Result<Box<dyn TraceSpan>, TelemetryError> {
        Ok(Box::new(EventSpan {
            hub: Arc::clone(&self.hub),
            name: name.to_string(),
            trace_id: self.trace_id,
            span_id: SpanId::new(),
            parent_id: Some(self.span_id),
            tags: Mutex::new(Metadata::new()),
            baggage: self.baggage.clone(),
            start_time: Utc::now(),
            finished: AtomicBool::new(false),
        }))
    }

    fn tag(&self, key: &str, value: Value) -> Result<(), TelemetryError> {
        if self.is_finished() {
            return Err(TelemetryError::SpanFinished(self.name.clone()));
        }
        self.tags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    fn finish(&self) -> Result<(), TelemetryError> {
        if self.finished.swap(true, Ordering::AcqRel) {
            return Err(TelemetryError::SpanFinished(self.name.clone()));
        }

        let mut event = Metadata::new();
        event.insert("type".to_string(), json!("trace"));
        event.insert("traceId".to_string(), json!(self.trace_id));
        event.insert("spanId".to_string(), json!(self.span_id));
        event.insert("parentId".to_string(), json!(self.parent_id));
        event.insert("name".to_string(), json!(self.name));
        event.insert("tags".to_string(), Value::Object(self.tags()));
        event.insert("baggage".to_string(), Value::Object(self.baggage.clone()));
        event.insert("startTime".to_string(), json!(rfc3339(self.start_time)));
        event.insert("finishTime".to_string(), json!(rfc3339(Utc::now())));

        self.hub.emit(event);
        Ok(())
    }
}
