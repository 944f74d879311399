// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading from JSON and YAML files.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::InstrumentConfig;

/// Config file names to search for (in order).
pub const CONFIG_FILES: &[&str] = &[
    ".dynamo-instrument.json",
    ".dynamo-instrument.yaml",
    "dynamo-instrument.config.json",
];

/// Find the first config file present in `dir`.
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Load the config file found in `dir`, if any.
pub fn load_config(dir: &Path) -> Result<Option<InstrumentConfig>, ConfigError> {
    find_config_file(dir)
        .map(|path| load_config_file(&path))
        .transpose()
}

/// Load and validate a configuration file (JSON or YAML by extension).
pub fn load_config_file(path: &Path) -> Result<InstrumentConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let config: InstrumentConfig = match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        "json" => serde_json::from_str(&content)?,
        other => {
            return Err(ConfigError::InvalidFormat(format!(
                "{}: unsupported extension {other:?}",
                path.display()
            )))
        }
    };

    config.validate()?;
    Ok(config)
}
