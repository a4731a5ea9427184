//! Error types for metadata persistence.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for metadata persistence.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors raised while reading or writing the metadata file.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Filesystem access failed.
    #[error("metadata io failure")]
    Io {
        /// Operation being performed.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The metadata document could not be encoded or decoded.
    #[error("metadata json failure")]
    Json {
        /// Operation being performed.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl RuntimeError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: serde_json::Error,
    ) -> Self {
        Self::Json {
            operation,
            path: path.into(),
            source,
        }
    }
}
