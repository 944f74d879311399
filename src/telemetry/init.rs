// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Subscriber installation for the `tracing` output of this crate.

use std::io;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// How diagnostics and [`TracingLogs`](super::TracingLogs) output is rendered.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level used when neither `RUST_LOG` nor `filter_directive` is set.
    pub default_level: Level,

    /// Emit span open/close events (shows instrumented call spans).
    pub include_span_events: bool,

    pub include_file_line: bool,
    pub include_target: bool,
    pub ansi_colors: bool,
    pub compact: bool,

    /// Custom filter directive, takes precedence over `RUST_LOG`.
    pub filter_directive: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            include_span_events: false,
            include_file_line: false,
            include_target: true,
            ansi_colors: true,
            compact: true,
            filter_directive: None,
        }
    }
}

impl LogConfig {
    /// Verbose output with span lifecycle events.
    pub fn development() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_span_events: true,
            include_file_line: true,
            compact: false,
            ..Self::default()
        }
    }

    /// Warnings and errors only, no colors.
    pub fn production() -> Self {
        Self {
            default_level: Level::WARN,
            include_target: false,
            ansi_colors: false,
            ..Self::default()
        }
    }

    /// Everything this crate emits, nothing from dependencies.
    pub fn testing() -> Self {
        Self {
            default_level: Level::TRACE,
            include_span_events: true,
            include_file_line: true,
            ansi_colors: false,
            compact: false,
            filter_directive: Some("dynamo_instrument=trace".to_string()),
            ..Self::default()
        }
    }

    /// Map a CLI verbosity count (0 = warn, 1 = info, 2 = debug, 3+ = trace).
    pub fn for_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self::default().with_level(level)
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_directive = Some(filter.into());
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi_colors = ansi;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.default_level.to_string());
        match &self.filter_directive {
            Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|_| fallback()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }
}

/// Keep alive for the duration of the program.
pub struct LogGuard {
    _private: (),
}

/// Install the global subscriber. Call once at startup.
///
/// Fails if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> io::Result<LogGuard> {
    let span_events = if config.include_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_file(config.include_file_line)
        .with_line_number(config.include_file_line)
        .with_span_events(span_events);

    let registry = tracing_subscriber::registry().with(config.env_filter());
    let installed = if config.compact {
        registry.with(fmt_layer.compact()).try_init()
    } else {
        registry.with(fmt_layer).try_init()
    };
    installed.map_err(|e| io::Error::other(e.to_string()))?;

    Ok(LogGuard { _private: () })
}
