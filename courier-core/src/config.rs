//! Configuration management.
//!
//! Supports TOML and JSON configuration files with environment variable
//! overrides. Every knob has a serde default so a partial file (or none at
//! all) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// TOML format (.toml)
    #[default]
    Toml,
    /// JSON format (.json)
    Json,
}

impl ConfigFormat {
    /// Detects the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "toml" => Some(Self::Toml),
                "json" => Some(Self::Json),
                _ => None,
            })
    }
}

/// Configuration for the change-feed connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Realtime channel endpoint URL (`wss://...`).
    #[serde(default)]
    pub url: String,

    /// API key sent when joining the channel, if the backend requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Heartbeat interval in milliseconds.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Topic prefix for notification channels.
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_topic_prefix() -> String {
    "notifications".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            topic_prefix: default_topic_prefix(),
        }
    }
}

impl FeedConfig {
    /// Creates a new builder for `FeedConfig`.
    #[must_use]
    pub fn builder() -> FeedConfigBuilder {
        FeedConfigBuilder::default()
    }

    /// Returns the connection timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the heartbeat interval as a Duration.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

/// Builder for `FeedConfig`.
#[derive(Debug, Default)]
pub struct FeedConfigBuilder {
    url: Option<String>,
    api_key: Option<String>,
    connect_timeout_ms: Option<u64>,
    heartbeat_interval_ms: Option<u64>,
    topic_prefix: Option<String>,
}

impl FeedConfigBuilder {
    /// Sets the endpoint URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Sets the heartbeat interval.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    /// Sets the topic prefix.
    #[must_use]
    pub fn topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = Some(prefix.into());
        self
    }

    /// Builds the `FeedConfig`.
    #[must_use]
    pub fn build(self) -> FeedConfig {
        FeedConfig {
            url: self.url.unwrap_or_default(),
            api_key: self.api_key,
            connect_timeout_ms: self
                .connect_timeout_ms
                .unwrap_or_else(default_connect_timeout_ms),
            heartbeat_interval_ms: self
                .heartbeat_interval_ms
                .unwrap_or_else(default_heartbeat_interval_ms),
            topic_prefix: self.topic_prefix.unwrap_or_else(default_topic_prefix),
        }
    }
}

/// Configuration for the local inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxConfig {
    /// Maximum number of notifications kept in memory, newest first.
    #[serde(default = "default_retention")]
    pub retention: usize,

    /// Row limit for the initial and reconciling bulk fetches.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,

    /// Capacity of the pipeline command channel.
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,
}

fn default_retention() -> usize {
    20
}

fn default_fetch_limit() -> usize {
    20
}

fn default_command_capacity() -> usize {
    64
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
            fetch_limit: default_fetch_limit(),
            command_capacity: default_command_capacity(),
        }
    }
}

/// Configuration for toast presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToastConfig {
    /// How long a banner stays visible before auto-dismissal, in
    /// milliseconds.
    #[serde(default = "default_banner_duration_ms")]
    pub banner_duration_ms: u64,

    /// Duration of the banner exit transition, in milliseconds.
    #[serde(default = "default_exit_transition_ms")]
    pub exit_transition_ms: u64,

    /// Icon passed to the desktop notification capability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop_icon: Option<String>,
}

fn default_banner_duration_ms() -> u64 {
    6_000
}

fn default_exit_transition_ms() -> u64 {
    300
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            banner_duration_ms: default_banner_duration_ms(),
            exit_transition_ms: default_exit_transition_ms(),
            desktop_icon: None,
        }
    }
}

impl ToastConfig {
    /// Returns the banner duration as a Duration.
    #[must_use]
    pub fn banner_duration(&self) -> Duration {
        Duration::from_millis(self.banner_duration_ms)
    }

    /// Returns the exit transition as a Duration.
    #[must_use]
    pub fn exit_transition(&self) -> Duration {
        Duration::from_millis(self.exit_transition_ms)
    }
}

/// Top-level Courier configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourierConfig {
    /// Change-feed connection settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Local inbox settings.
    #[serde(default)]
    pub inbox: InboxConfig,

    /// Toast presentation settings.
    #[serde(default)]
    pub toast: ToastConfig,
}

impl CourierConfig {
    /// Loads configuration from a file, detecting the format from the
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, the extension is
    /// not recognized, or the content does not parse.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format =
            ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
                extension: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_string(),
            })?;

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        match format {
            ConfigFormat::Toml => Self::from_toml_str(&content),
            ConfigFormat::Json => Self::from_json_str(&content),
        }
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the content does not parse.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::parse(e.to_string()))
    }

    /// Parses configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the content does not parse.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::parse(e.to_string()))
    }

    /// Applies environment variable overrides.
    ///
    /// Recognized variables: `COURIER_FEED_URL`, `COURIER_FEED_API_KEY`,
    /// `COURIER_INBOX_RETENTION`, `COURIER_INBOX_FETCH_LIMIT`,
    /// `COURIER_TOAST_DURATION_MS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric override does not
    /// parse.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("COURIER_FEED_URL") {
            self.feed.url = url;
        }
        if let Ok(key) = std::env::var("COURIER_FEED_API_KEY") {
            self.feed.api_key = Some(key);
        }
        if let Ok(v) = std::env::var("COURIER_INBOX_RETENTION") {
            self.inbox.retention = v
                .parse()
                .map_err(|_| ConfigError::invalid_value("inbox.retention", v))?;
        }
        if let Ok(v) = std::env::var("COURIER_INBOX_FETCH_LIMIT") {
            self.inbox.fetch_limit = v
                .parse()
                .map_err(|_| ConfigError::invalid_value("inbox.fetch_limit", v))?;
        }
        if let Ok(v) = std::env::var("COURIER_TOAST_DURATION_MS") {
            self.toast.banner_duration_ms = v
                .parse()
                .map_err(|_| ConfigError::invalid_value("toast.banner_duration_ms", v))?;
        }
        Ok(())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inbox.retention == 0 {
            return Err(ConfigError::invalid_value(
                "inbox.retention",
                "must be greater than zero",
            ));
        }
        if self.inbox.fetch_limit == 0 {
            return Err(ConfigError::invalid_value(
                "inbox.fetch_limit",
                "must be greater than zero",
            ));
        }
        if self.inbox.command_capacity == 0 {
            return Err(ConfigError::invalid_value(
                "inbox.command_capacity",
                "must be greater than zero",
            ));
        }
        if self.toast.banner_duration_ms == 0 {
            return Err(ConfigError::invalid_value(
                "toast.banner_duration_ms",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}
