//! Settings file loading, repair, and persistence.
//!
//! # Design
//! - A missing file is created with defaults.
//! - Missing sections or keys are filled in and written back.
//! - An unparseable file is logged and rewritten with defaults.
//! - Setters persist immediately.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use toml::Table;
use tracing::{error, info};

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    DownloadsSettings, LogFormat, LoggingSettings, SessionSettings, Settings, SpeedSettings,
};
use crate::validate::{FieldReader, report};

/// Settings bound to the file they were loaded from.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
    settings: Settings,
}

impl SettingsFile {
    /// Load settings from `path`, creating or repairing the file as needed.
    ///
    /// # Errors
    ///
    /// Returns an error only when the file cannot be read for a reason other
    /// than absence, or when a created or repaired file cannot be written.
    pub fn open(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => Some(raw),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(ConfigError::Io {
                    operation: "read_settings",
                    path,
                    source,
                });
            }
        };

        let Some(raw) = raw else {
            info!(path = %path.display(), "settings file not found, writing defaults");
            let file = Self {
                path,
                settings: Settings::default(),
            };
            file.save()?;
            return Ok(file);
        };

        match raw.parse::<Table>() {
            Ok(table) => {
                let (settings, filled_missing) = settings_from_table(&table);
                let file = Self { path, settings };
                if filled_missing {
                    info!(path = %file.path.display(), "settings file completed with defaults");
                    file.save()?;
                }
                Ok(file)
            }
            Err(err) => {
                error!(
                    path = %path.display(),
                    error = %err,
                    "settings file unreadable, restoring defaults"
                );
                let file = Self {
                    path,
                    settings: Settings::default(),
                };
                file.save()?;
                Ok(file)
            }
        }
    }

    /// Loaded settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// File backing these settings.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Change the default save path and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn set_download_path(&mut self, path: &Path) -> ConfigResult<()> {
        self.settings.downloads.download_path = path.to_string_lossy().into_owned();
        self.save()
    }

    /// Change both rate limits (bytes per second, 0 = unlimited) and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn set_speed_limits(&mut self, download_bps: u64, upload_bps: u64) -> ConfigResult<()> {
        self.settings.speed = SpeedSettings {
            max_download_speed: download_bps,
            max_upload_speed: upload_bps,
        };
        self.save()
    }

    /// Write the current settings to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save(&self) -> ConfigResult<()> {
        let encoded = toml::to_string_pretty(&self.settings).map_err(|source| {
            ConfigError::Encode {
                path: self.path.clone(),
                source,
            }
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                operation: "create_settings_dir",
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, encoded).map_err(|source| ConfigError::Io {
            operation: "write_settings",
            path: self.path.clone(),
            source,
        })
    }
}

fn settings_from_table(table: &Table) -> (Settings, bool) {
    let mut reader = FieldReader::new(table);
    let session_defaults = SessionSettings::default();

    let downloads = DownloadsSettings {
        download_path: reader.string("downloads", "download_path", ""),
    };
    let speed = SpeedSettings {
        max_download_speed: reader.speed("speed", "max_download_speed"),
        max_upload_speed: reader.speed("speed", "max_upload_speed"),
    };
    let session = SessionSettings {
        listen_port_start: reader.port(
            "session",
            "listen_port_start",
            session_defaults.listen_port_start,
        ),
        listen_port_end: reader.port(
            "session",
            "listen_port_end",
            session_defaults.listen_port_end,
        ),
        poll_interval_ms: reader.positive(
            "session",
            "poll_interval_ms",
            session_defaults.poll_interval_ms,
        ),
        metadata_file: reader.string("session", "metadata_file", defaults::METADATA_FILE),
    };

    let format_text = reader.string("logging", "format", "pretty");
    let format = LogFormat::parse(&format_text).unwrap_or_else(|| {
        report(&ConfigError::InvalidField {
            section: "logging",
            field: "format",
            value: Some(format_text.clone()),
            reason: "must be pretty or json",
        });
        LogFormat::default()
    });
    let logging = LoggingSettings {
        level: reader.string("logging", "level", defaults::LOG_LEVEL),
        format,
        file: reader.string("logging", "file", defaults::LOG_FILE),
    };

    (
        Settings {
            downloads,
            speed,
            session,
            logging,
        },
        reader.filled_missing(),
    )
}
