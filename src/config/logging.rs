use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::errors::ConfigValidationError;

/// Console logging knobs. Log *sinks* (files, journald) are out of scope
/// here — this only shapes what `tracing-subscriber` writes to stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Enable trace-level logging for frame contents (unit id, function
    /// code, raw bytes) on top of the normal level filter.
    pub trace_frames: bool,

    /// Minimum log level for console output.
    pub level: String,

    /// Log format: "pretty" or "json".
    pub format: String,

    pub include_location: bool,
    pub thread_ids: bool,
    pub thread_names: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trace_frames: false,
            level: "info".to_string(),
            format: "pretty".to_string(),
            include_location: false,
            thread_ids: false,
            thread_names: false,
        }
    }
}

impl Config {
    pub fn get_level_filter(&self) -> LevelFilter {
        match self.level.to_lowercase().as_str() {
            "error" => LevelFilter::ERROR,
            "warn" => LevelFilter::WARN,
            "info" => LevelFilter::INFO,
            "debug" => LevelFilter::DEBUG,
            "trace" => LevelFilter::TRACE,
            _ => LevelFilter::INFO,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        match self.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            other => return Err(ConfigValidationError::source(format!("invalid log level: {other}"))),
        }
        match self.format.to_lowercase().as_str() {
            "pretty" | "json" => {}
            other => return Err(ConfigValidationError::source(format!("invalid log format: {other}"))),
        }
        Ok(())
    }
}
