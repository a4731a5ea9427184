//! Typed settings sections.
//!
//! # Design
//! - Field names match the on-disk TOML keys.
//! - Values here are already normalised; lenient parsing lives in `validate.rs`.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Complete settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Download location.
    pub downloads: DownloadsSettings,
    /// Session-wide rate limits.
    pub speed: SpeedSettings,
    /// Engine session and polling parameters.
    pub session: SessionSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// `[downloads]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadsSettings {
    /// Default save path; empty means "ask every time".
    pub download_path: String,
}

impl DownloadsSettings {
    /// Configured save path, if any.
    #[must_use]
    pub fn save_path(&self) -> Option<PathBuf> {
        let trimmed = self.download_path.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }
}

/// `[speed]`, in bytes per second with 0 meaning unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedSettings {
    /// Download limit.
    pub max_download_speed: u64,
    /// Upload limit.
    pub max_upload_speed: u64,
}

/// `[session]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// First listen port.
    pub listen_port_start: u16,
    /// Last listen port.
    pub listen_port_end: u16,
    /// Background poll interval.
    pub poll_interval_ms: u64,
    /// Metadata file location.
    pub metadata_file: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            listen_port_start: defaults::LISTEN_PORT_START,
            listen_port_end: defaults::LISTEN_PORT_END,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            metadata_file: defaults::METADATA_FILE.to_string(),
        }
    }
}

impl SessionSettings {
    /// Poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Output format for the terminal log layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Terminal output format.
    pub format: LogFormat,
    /// Log file; empty disables file output.
    pub file: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            format: LogFormat::Pretty,
            file: defaults::LOG_FILE.to_string(),
        }
    }
}

impl LoggingSettings {
    /// Log file path, if file output is enabled.
    #[must_use]
    pub fn file_path(&self) -> Option<PathBuf> {
        let trimmed = self.file.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }
}
