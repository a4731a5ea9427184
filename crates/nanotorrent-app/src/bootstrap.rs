//! Startup wiring: settings, logging, metrics, engine session and manager.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use nanotorrent_config::{LogFormat as SettingsLogFormat, Settings, SettingsFile};
use nanotorrent_engine::{LocalEngine, PortRange, SessionConfig};
use nanotorrent_telemetry::{LogFormat, LoggingConfig, Metrics, build_version, init_logging};
use nanotorrent_torrent_core::RateLimits;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::orchestrator::{ManagerConfig, TransferManager};

/// Everything a front-end command needs.
pub struct AppContext {
    /// Loaded settings, writable through its setters.
    pub settings: SettingsFile,
    /// Running transfer manager.
    pub manager: TransferManager,
    /// Shared metrics registry.
    pub metrics: Metrics,
}

/// Open settings, install logging and start the manager.
///
/// # Errors
///
/// Returns an error if the settings file cannot be written, logging cannot be
/// installed, or the engine session cannot be created.
pub async fn bootstrap(config_path: &Path) -> AppResult<AppContext> {
    let settings = SettingsFile::open(config_path)
        .map_err(|err| AppError::config("settings.open", err))?;
    init_telemetry(settings.settings())?;
    info!(
        version = build_version(),
        config = %settings.path().display(),
        "nanotorrent starting"
    );
    assemble(settings).await
}

/// Build the engine session and manager from already-loaded settings.
///
/// # Errors
///
/// Returns an error if metrics cannot be registered or the engine session
/// cannot be created.
pub async fn assemble(settings: SettingsFile) -> AppResult<AppContext> {
    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let engine = LocalEngine::create_session(session_config(settings.settings()))
        .map_err(|err| AppError::torrent("engine.create_session", err))?;
    let manager = TransferManager::start(
        Arc::new(engine),
        manager_config(settings.settings()),
        metrics.clone(),
    )
    .await;
    Ok(AppContext {
        settings,
        manager,
        metrics,
    })
}

fn init_telemetry(settings: &Settings) -> AppResult<()> {
    let file = settings.logging.file_path();
    let config = LoggingConfig {
        level: &settings.logging.level,
        format: match settings.logging.format {
            SettingsLogFormat::Pretty => LogFormat::Pretty,
            SettingsLogFormat::Json => LogFormat::Json,
        },
        file: file.as_deref(),
        build_version: env!("CARGO_PKG_VERSION"),
    };
    init_logging(&config).map_err(|err| AppError::telemetry("telemetry.init", err))
}

pub(crate) const fn rate_limits(settings: &Settings) -> RateLimits {
    RateLimits {
        download_bps: settings.speed.max_download_speed,
        upload_bps: settings.speed.max_upload_speed,
    }
}

fn session_config(settings: &Settings) -> SessionConfig {
    SessionConfig {
        listen_ports: PortRange {
            start: settings.session.listen_port_start,
            end: settings.session.listen_port_end,
        },
        rate_limits: rate_limits(settings),
    }
}

fn manager_config(settings: &Settings) -> ManagerConfig {
    ManagerConfig {
        metadata_file: PathBuf::from(&settings.session.metadata_file),
        poll_interval: settings.session.poll_interval(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn settings_map_onto_session_and_manager() {
        let mut settings = Settings::default();
        settings.speed.max_download_speed = 2048;
        settings.speed.max_upload_speed = 512;
        settings.session.listen_port_start = 7000;
        settings.session.listen_port_end = 7010;
        settings.session.poll_interval_ms = 250;

        let session = session_config(&settings);
        assert_eq!(session.listen_ports, PortRange { start: 7000, end: 7010 });
        assert_eq!(session.rate_limits.download_bps, 2048);
        assert_eq!(session.rate_limits.upload_bps, 512);

        let manager = manager_config(&settings);
        assert_eq!(manager.metadata_file, PathBuf::from("torrent_metadata.json"));
        assert_eq!(manager.poll_interval, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn invalid_port_range_is_fatal() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("settings.toml");
        std::fs::write(
            &path,
            "[session]\nlisten_port_start = 7000\nlisten_port_end = 6000\n",
        )?;
        let settings = SettingsFile::open(&path)?;
        let result = assemble(settings).await;
        assert!(matches!(
            result,
            Err(AppError::Torrent {
                operation: "engine.create_session",
                ..
            })
        ));
        Ok(())
    }
}
