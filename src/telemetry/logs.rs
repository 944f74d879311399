// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Log collaborator backed by the `tracing` crate.

use serde_json::Value;

use super::collaborators::Logs;
use crate::error::TelemetryError;
use crate::metadata::merged;
use crate::types::{LogLevel, Metadata};

/// [`Logs`] implementation that forwards each event to `tracing`.
///
/// Base and extra fields are merged and attached as a single JSON `fields`
/// value, so whatever subscriber is installed decides how they are rendered.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogs;

impl TracingLogs {
    pub fn new() -> Self {
        Self
    }
}

impl Logs for TracingLogs {
    fn log(
        &self,
        level: LogLevel,
        message: &str,
        base: &Metadata,
        extra: Metadata,
    ) -> Result<(), TelemetryError> {
        let fields = Value::Object(merged(base.clone(), &extra));

        match level {
            LogLevel::Info => {
                tracing::info!(target: "dynamo_instrument::calls", fields = %fields, "{}", message)
            }
            LogLevel::Error => {
                tracing::error!(target: "dynamo_instrument::calls", fields = %fields, "{}", message)
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::object;
    use serde_json::json;

    #[test]
    fn test_tracing_logs_never_fails() {
        let logs = TracingLogs::new();
        let base = object(json!({"target": {"method": "getItem"}}));

        assert!(logs
            .log(LogLevel::Info, "attempting DynamoDB.getItem", &base, Metadata::new())
            .is_ok());
        assert!(logs
            .log(
                LogLevel::Error,
                "DynamoDB.getItem failed",
                &base,
                object(json!({"error": "boom"})),
            )
            .is_ok());
    }
}
