//! Structured logging for the combat core.
//!
//! Rejected claims log at `debug` under `damage_core::combat`, never as
//! errors: a rejection is an expected outcome of a tick. `RUST_LOG` wins over
//! whatever [`TracingConfig`] asks for.

use std::fmt;
use std::sync::Once;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::config::CoreConfig;

/// Installs tracing from the app's [`CoreConfig`], defaults when absent
pub struct LoggingPlugin;

impl Plugin for LoggingPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<CoreConfig>()
            .map(|c| c.tracing.clone())
            .unwrap_or_default();
        init_tracing(&config);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    }
}

/// One `target=level` directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleFilter {
    pub target: String,
    pub level: LogLevel,
}

impl ModuleFilter {
    pub fn new(target: impl Into<String>, level: LogLevel) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }
}

impl fmt::Display for ModuleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.target, self.level)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub level: LogLevel,
    pub filters: Vec<ModuleFilter>,
    pub with_target: bool,
    pub with_thread_ids: bool,
    /// File and line of each event
    pub with_source_location: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            filters: vec![
                ModuleFilter::new("damage_core::combat", LogLevel::Debug),
                ModuleFilter::new("damage_core::delivery", LogLevel::Debug),
                ModuleFilter::new("damage_core::net", LogLevel::Info),
            ],
            with_target: true,
            with_thread_ids: false,
            with_source_location: false,
        }
    }
}

impl TracingConfig {
    /// `EnvFilter` directives, e.g. `info,damage_core::combat=debug`
    pub fn directives(&self) -> String {
        std::iter::once(self.level.to_string())
            .chain(self.filters.iter().map(ToString::to_string))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Set the level of one target, replacing any directive already there
    pub fn with_filter(mut self, target: impl Into<String>, level: LogLevel) -> Self {
        let target = target.into();
        match self.filters.iter_mut().find(|f| f.target == target) {
            Some(existing) => existing.level = level,
            None => self.filters.push(ModuleFilter::new(target, level)),
        }
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directives()))
    }
}

static INIT: Once = Once::new();

/// Install the global fmt subscriber. Only the first call does anything, and
/// a subscriber installed elsewhere (Bevy's `LogPlugin`) is left in place.
pub fn init_tracing(config: &TracingConfig) {
    INIT.call_once(|| {
        let installed = tracing_subscriber::fmt()
            .with_env_filter(config.env_filter())
            .with_target(config.with_target)
            .with_thread_ids(config.with_thread_ids)
            .with_file(config.with_source_location)
            .with_line_number(config.with_source_location)
            .compact()
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!(directives = %config.directives(), "tracing installed");
        }
    });
}
