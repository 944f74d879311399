// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Dynamo Instrument - telemetry for DynamoDB-style client methods.
//!
//! Wraps named asynchronous operations of a client so that every call emits a
//! structured log, a latency gauge, and (when a parent span is supplied) a
//! child trace span, while the caller sees exactly the result the original
//! operation produced.
//!
//! # Architecture
//!
//! - [`types`] - Target descriptors, call contexts, outcomes
//! - [`error`] - Error types and result aliases
//! - [`target`] - Method tables and the [`Operation`] trait
//! - [`instrument`] - The instrumentation pipeline
//! - [`metadata`] - Deep merging of caller metadata
//! - [`telemetry`] - Collaborator traits and bundled backends
//! - [`config`] - Instrumentation config files
//! - [`memory`] - In-memory table for demos and tests
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dynamo_instrument::memory::MemoryTable;
//! use dynamo_instrument::telemetry::{Telemetry, TracingLogs};
//! use dynamo_instrument::{instrument, CallContext};
//!
//! let telemetry = Telemetry::new().with_logs(Arc::new(TracingLogs::new()));
//! let table = instrument(MemoryTable::new().into_target(), "2.1.0", &["getItem"], &telemetry, None);
//!
//! let outcome = table
//!     .call_instrumented("instrumentedGetItem", Arc::new(json!({"Key": {"id": "x"}})), CallContext::new())
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod instrument;
pub mod memory;
pub mod metadata;
pub mod target;
pub mod telemetry;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{ConfigError, InstrumentError, Result, TelemetryError};
pub use instrument::{instrument, instrument_document_client, InstrumentedMethod};
pub use target::{instrumented_name, Operation, Target, TargetBuilder};
pub use types::{CallContext, CallOutcome, Metadata, Params, ResultContext, TargetDescriptor};

/// Crate version, reported as event provenance.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
