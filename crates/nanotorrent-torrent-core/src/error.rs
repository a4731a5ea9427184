//! Error types for transfer engine operations.

use std::error::Error;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::TransferHandle;

/// Primary error type for engine and descriptor operations.
#[derive(Debug, Error)]
pub enum TorrentError {
    /// Descriptor bytes could not be decoded or failed structural validation.
    #[error("invalid transfer descriptor")]
    InvalidDescriptor {
        /// Static reason describing the failure.
        reason: &'static str,
        /// Byte offset where decoding failed, when known.
        offset: Option<usize>,
    },
    /// The session already holds a transfer with the same content hash.
    #[error("transfer already registered")]
    DuplicateTransfer {
        /// Hex-encoded content hash of the rejected descriptor.
        info_hash: String,
    },
    /// Handle does not reference a live transfer.
    #[error("unknown transfer handle")]
    UnknownHandle {
        /// Handle supplied by the caller.
        handle: TransferHandle,
    },
    /// Session parameters were rejected.
    #[error("invalid session configuration")]
    InvalidSession {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// IO failure while the engine created or inspected storage.
    #[error("engine storage io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Operation failed in the underlying engine.
    #[error("engine operation failed")]
    OperationFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl TorrentError {
    /// Build an IO error with operation and path context.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) const fn descriptor(reason: &'static str) -> Self {
        Self::InvalidDescriptor {
            reason,
            offset: None,
        }
    }

    pub(crate) const fn descriptor_at(reason: &'static str, offset: usize) -> Self {
        Self::InvalidDescriptor {
            reason,
            offset: Some(offset),
        }
    }
}

/// Convenience alias for engine operation results.
pub type TorrentResult<T> = Result<T, TorrentError>;
