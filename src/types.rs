// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core type definitions shared by the instrumentor and its collaborators.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::telemetry::TraceSpan;

/// Module label embedded in every target descriptor.
pub const MODULE: &str = "aws-sdk";

/// Export label used by [`crate::instrument`].
pub const DEFAULT_EXPORT: &str = "DynamoDB";

/// Export label used by [`crate::instrument_document_client`].
pub const DOCUMENT_CLIENT_EXPORT: &str = "DynamoDB.DocumentClient";

/// Open key/value metadata attached to telemetry events.
pub type Metadata = Map<String, Value>;

/// Parameters passed to a target operation.
///
/// Shared so that the wrapped operation receives exactly the value the
/// caller handed to the instrumented method.
pub type Params = Arc<Value>;

/// Identifies the operation being called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    pub module: String,
    pub version: String,
    pub export: String,
    pub method: String,
}

impl TargetDescriptor {
    /// Create a descriptor for `export.method` of the given library version.
    pub fn new(version: impl Into<String>, export: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            module: MODULE.to_string(),
            version: version.into(),
            export: export.into(),
            method: method.into(),
        }
    }

    /// `export.method`, the name used for log messages and spans.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.export, self.method)
    }

    /// Render as a JSON value.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "module": self.module,
            "version": self.version,
            "export": self.export,
            "method": self.method,
        })
    }
}

/// Severity of a log event emitted by the instrumentor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point-in-time numeric metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gauge {
    pub unit: String,
    pub value: f64,
    pub metadata: Metadata,
}

/// Per-call context supplied by the caller.
#[derive(Clone, Default)]
pub struct CallContext {
    /// Metadata merged into every event emitted for this call.
    pub metadata: Option<Metadata>,

    /// Value reported in logs instead of the real parameters.
    pub params_to_log: Option<Value>,

    /// Span under which a child span is opened for this call.
    pub parent_span: Option<Arc<dyn TraceSpan>>,
}

impl CallContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach caller metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Report `params` in logs in place of the real parameters.
    pub fn with_params_to_log(mut self, params: Value) -> Self {
        self.params_to_log = Some(params);
        self
    }

    /// Trace this call under `span`.
    pub fn with_parent_span(mut self, span: Arc<dyn TraceSpan>) -> Self {
        self.parent_span = Some(span);
        self
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("metadata", &self.metadata)
            .field("params_to_log", &self.params_to_log)
            .field("parent_span", &self.parent_span.is_some())
            .finish()
    }
}

/// Context handed back to the caller alongside the operation result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultContext {
    pub target_metadata: Metadata,
}

impl ResultContext {
    /// The descriptor of the call that produced this context.
    pub fn target(&self) -> Option<TargetDescriptor> {
        self.target_metadata
            .get("target")
            .and_then(|target| serde_json::from_value(target.clone()).ok())
    }
}

/// Everything an instrumented call produces.
#[derive(Debug)]
pub struct CallOutcome {
    /// The wrapped operation's own result, never altered.
    pub result: anyhow::Result<Value>,
    pub context: ResultContext,
}

impl CallOutcome {
    /// Check whether the wrapped operation failed.
    pub fn is_error(&self) -> bool {
        self.result.is_err()
    }

    /// Split into the result and its context.
    pub fn into_parts(self) -> (anyhow::Result<Value>, ResultContext) {
        (self.result, self.context)
    }
}
