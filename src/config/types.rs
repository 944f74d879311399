// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Instrumentation configuration.
//!
//! Describes which methods of a target to instrument and how, in JSON or YAML.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::instrument::{instrument, instrument_document_client};
use crate::target::Target;
use crate::telemetry::{FailurePolicy, Telemetry};
use crate::types::{DEFAULT_EXPORT, DOCUMENT_CLIENT_EXPORT};

/// Instrumentation settings for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentConfig {
    /// Version of the wrapped library, embedded in every target descriptor
    pub version: String,

    /// Methods to instrument
    pub methods: Vec<String>,

    /// Export label (defaults to "DynamoDB", or "DynamoDB.DocumentClient")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<String>,

    /// Label the target as a document client
    #[serde(default)]
    pub document_client: bool,

    /// What to do when a telemetry collaborator fails
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl InstrumentConfig {
    /// Config for `methods` of library `version` with default settings.
    pub fn new<S: Into<String>>(version: impl Into<String>, methods: impl IntoIterator<Item = S>) -> Self {
        Self {
            version: version.into(),
            methods: methods.into_iter().map(Into::into).collect(),
            export: None,
            document_client: false,
            failure_policy: FailurePolicy::default(),
        }
    }

    /// The export label telemetry will carry.
    pub fn export_label(&self) -> &str {
        match (&self.export, self.document_client) {
            (Some(export), _) => export,
            (None, true) => DOCUMENT_CLIENT_EXPORT,
            (None, false) => DEFAULT_EXPORT,
        }
    }

    /// Check for values that would produce unusable telemetry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::invalid("version", "must not be empty"));
        }
        if let Some(index) = self.methods.iter().position(|m| m.trim().is_empty()) {
            return Err(ConfigError::invalid(
                format!("methods[{index}]"),
                "must not be empty",
            ));
        }
        if matches!(&self.export, Some(export) if export.trim().is_empty()) {
            return Err(ConfigError::invalid("export", "must not be empty"));
        }
        Ok(())
    }

    /// Instrument `target` as described, applying the configured failure policy.
    pub fn apply(&self, target: Target, telemetry: &Telemetry) -> Target {
        let telemetry = telemetry.clone().with_failure_policy(self.failure_policy);
        match (&self.export, self.document_client) {
            (None, true) => instrument_document_client(target, &self.version, &self.methods, &telemetry),
            (export, _) => instrument(target, &self.version, &self.methods, &telemetry, export.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTable;

    #[test]
    fn test_deserialize_minimal() {
        let config: InstrumentConfig =
            serde_json::from_str(r#"{"version": "2.1.0", "methods": ["getItem"]}"#).unwrap();
        assert_eq!(config, InstrumentConfig::new("2.1.0", ["getItem"]));
        assert_eq!(config.export_label(), "DynamoDB");
    }

    #[test]
    fn test_deserialize_full_yaml() {
        let yaml = "version: 2.1.0\nmethods: [get, createSet]\ndocumentClient: true\nfailurePolicy: isolate\n";
        let config: InstrumentConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.document_client);
        assert_eq!(config.failure_policy, FailurePolicy::Isolate);
        assert_eq!(config.export_label(), "DynamoDB.DocumentClient");
    }

    #[test]
    fn test_explicit_export_wins() {
        let mut config = InstrumentConfig::new("1.0", ["getItem"]);
        config.export = Some("Ledger".to_string());
        config.document_client = true;
        assert_eq!(config.export_label(), "Ledger");
    }

    #[test]
    fn test_validate() {
        assert!(InstrumentConfig::new("1.0", ["getItem"]).validate().is_ok());

        let err = InstrumentConfig::new(" ", ["getItem"]).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "version"));

        let err = InstrumentConfig::new("1.0", ["getItem", ""]).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "methods[1]"));
    }

    #[test]
    fn test_apply_uses_export_label() {
        let mut config = InstrumentConfig::new("1.0", ["getItem", "putItem"]);
        config.document_client = true;
        config.failure_policy = FailurePolicy::Isolate;

        let target = config.apply(MemoryTable::new().into_target(), &Telemetry::new());
        let method = target.instrumented("instrumentedPutItem").unwrap();

        assert_eq!(method.qualified_name(), "DynamoDB.DocumentClient.putItem");
        assert_eq!(method.telemetry().failure_policy, FailurePolicy::Isolate);
        assert!(target.instrumented("instrumentedDeleteItem").is_none());
    }
}
