//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Newline-delimited JSON with flattened event fields.
    Json,
    /// Human-readable format for development.
    #[default]
    Pretty,
}

/// File rotation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationConfig {
    /// Rotate every hour.
    Hourly,
    /// Rotate every day.
    Daily,
    /// Never rotate.
    Never,
}

/// A log output target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "target")]
pub enum LogOutput {
    /// Write to standard output.
    Stdout,
    /// Write to a rotating file in a directory.
    File {
        /// Directory the log files are written to.
        path: String,
        /// Rotation policy; daily when omitted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rotation: Option<RotationConfig>,
    },
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default level filter, overridable with `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output targets.
    #[serde(default = "default_outputs")]
    pub outputs: Vec<LogOutput>,

    /// Whether to include thread ids in events.
    #[serde(default)]
    pub include_thread_id: bool,

    /// Whether to include source file and line numbers.
    #[serde(default)]
    pub include_file_info: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_outputs() -> Vec<LogOutput> {
    vec![LogOutput::Stdout]
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            outputs: default_outputs(),
            include_thread_id: false,
            include_file_info: false,
        }
    }
}
