//! # Design
//!
//! - `LifecycleError` covers transfer operations; `AppError` covers bootstrap
//!   and the command-line front end.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::error::Error;
use std::io;

use nanotorrent_config::ConfigError;
use nanotorrent_runtime::RuntimeError;
use nanotorrent_telemetry::TelemetryError;
use nanotorrent_torrent_core::TorrentError;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Failures surfaced by [`crate::TransferManager`].
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Request was missing a required input; nothing changed.
    #[error("invalid transfer request")]
    Configuration {
        /// Input that was rejected.
        field: &'static str,
        /// Machine-readable reason.
        reason: &'static str,
    },
    /// Adding a transfer failed; nothing was registered.
    #[error("failed to add transfer")]
    AddTransfer {
        /// Step that failed (`read_descriptor`, `prepare_staging`, ...).
        stage: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The engine rejected an operation.
    #[error("engine operation failed")]
    Engine {
        /// Operation identifier.
        operation: &'static str,
        /// Transfer involved, when the operation targets one.
        id: Option<Uuid>,
        /// Underlying engine error.
        #[source]
        source: TorrentError,
    },
    /// No transfer with this identifier is registered.
    #[error("transfer not found")]
    NotFound {
        /// Identifier supplied by the caller.
        id: Uuid,
    },
    /// Metadata could not be saved.
    #[error("failed to persist transfer metadata")]
    Persistence {
        /// Underlying store error.
        #[source]
        source: RuntimeError,
    },
    /// A blocking task panicked or was cancelled.
    #[error("background task failed")]
    Task {
        /// Operation identifier.
        operation: &'static str,
        /// Join failure.
        #[source]
        source: tokio::task::JoinError,
    },
}

impl LifecycleError {
    pub(crate) fn add(stage: &'static str, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::AddTransfer {
            stage,
            source: source.into(),
        }
    }

    pub(crate) const fn engine(
        operation: &'static str,
        id: Option<Uuid>,
        source: TorrentError,
    ) -> Self {
        Self::Engine {
            operation,
            id,
            source,
        }
    }

    pub(crate) const fn task(operation: &'static str, source: tokio::task::JoinError) -> Self {
        Self::Task { operation, source }
    }
}

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Settings could not be loaded or saved.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: ConfigError,
    },
    /// Telemetry could not be installed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: TelemetryError,
    },
    /// The engine session could not be created.
    #[error("torrent engine operation failed")]
    Torrent {
        /// Operation identifier.
        operation: &'static str,
        /// Source torrent error.
        source: TorrentError,
    },
    /// A lifecycle operation failed.
    #[error("transfer operation failed")]
    Lifecycle {
        /// Operation identifier.
        operation: &'static str,
        /// Source lifecycle error.
        source: LifecycleError,
    },
    /// A command-line argument was invalid.
    #[error("invalid argument")]
    InvalidArgument {
        /// Argument name.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// Output could not be rendered.
    #[error("failed to render output")]
    Render {
        /// Source JSON error.
        source: serde_json::Error,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(operation: &'static str, source: TelemetryError) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn torrent(operation: &'static str, source: TorrentError) -> Self {
        Self::Torrent { operation, source }
    }

    pub(crate) const fn lifecycle(operation: &'static str, source: LifecycleError) -> Self {
        Self::Lifecycle { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_helpers_keep_context() {
        let add = LifecycleError::add("prepare_staging", io::Error::other("disk full"));
        assert!(matches!(
            add,
            LifecycleError::AddTransfer {
                stage: "prepare_staging",
                ..
            }
        ));
        assert!(add.source().is_some());
        assert_eq!(add.to_string(), "failed to add transfer");

        let id = Uuid::new_v4();
        let engine = LifecycleError::engine(
            "remove_transfer",
            Some(id),
            TorrentError::io("scan", "/tmp", io::Error::other("io")),
        );
        assert!(matches!(engine, LifecycleError::Engine { id: Some(found), .. } if found == id));
    }

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "settings.open",
            ConfigError::InvalidField {
                section: "speed",
                field: "max_download_speed",
                value: None,
                reason: "must be an integer",
            },
        );
        assert!(matches!(config, AppError::Config { .. }));

        let lifecycle = AppError::lifecycle("remove", LifecycleError::NotFound { id: Uuid::nil() });
        assert!(lifecycle.source().is_some());
        assert_eq!(lifecycle.to_string(), "transfer operation failed");
    }
}
