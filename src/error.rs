// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the instrumentation layer.
//!
//! Errors raised by the wrapped operations themselves are plain `anyhow::Error`
//! values and are handed back to the caller untouched. The enums here only
//! cover failures of the instrumentation machinery: a method that was never
//! registered, a telemetry collaborator that failed to emit, or a bad config.

use thiserror::Error;

/// Errors returned by an instrumented method invocation.
#[derive(Error, Debug)]
pub enum InstrumentError {
    #[error("Method not found on target: {0}")]
    MethodNotFound(String),

    #[error("Telemetry emission failed: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl InstrumentError {
    /// Check if this error came from a telemetry collaborator.
    pub fn is_telemetry(&self) -> bool {
        matches!(self, Self::Telemetry(_))
    }
}

/// Errors that telemetry collaborators report back to the instrumentor.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("{collaborator} failed: {message}")]
    Emit {
        collaborator: &'static str,
        message: String,
    },

    #[error("Span already finished: {0}")]
    SpanFinished(String),
}

impl TelemetryError {
    /// Create an emission error for the named collaborator.
    pub fn emit(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self::Emit {
            collaborator,
            message: message.into(),
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl ConfigError {
    /// Create an invalid value error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;
