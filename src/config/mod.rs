// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration module.
//!
//! An [`InstrumentConfig`] lists the methods to instrument, the library
//! version, the export label, and the telemetry failure policy. It is read
//! from the first of [`CONFIG_FILES`] found in a directory, or from an
//! explicit path.

mod loader;
mod types;

pub use loader::{find_config_file, load_config, load_config_file, CONFIG_FILES};
pub use types::InstrumentConfig;
