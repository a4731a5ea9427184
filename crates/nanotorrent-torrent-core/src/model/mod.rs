//! Core transfer domain types and DTOs shared across the workspace.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque reference to a transfer held by the engine session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransferHandle(pub u64);

impl fmt::Display for TransferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where descriptor bytes for a new transfer come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DescriptorSource {
    /// A `.torrent` file on disk.
    Path {
        /// Location of the descriptor file.
        path: PathBuf,
    },
    /// Raw bencoded descriptor bytes.
    Bytes {
        /// Bencoded metainfo payload.
        bytes: Vec<u8>,
    },
}

impl DescriptorSource {
    #[must_use]
    /// Convenience constructor for file-based sources.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path { path: path.into() }
    }

    #[must_use]
    /// Convenience constructor for in-memory sources.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            bytes: bytes.into(),
        }
    }

    /// Whether the source carries no usable input.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Path { path } => path.as_os_str().is_empty(),
            Self::Bytes { bytes } => bytes.is_empty(),
        }
    }
}

/// Session-wide rate limits in bytes per second; `0` means unlimited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RateLimits {
    /// Maximum download rate.
    pub download_bps: u64,
    /// Maximum upload rate.
    pub upload_bps: u64,
}

impl RateLimits {
    /// Whether neither direction is capped.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.download_bps == 0 && self.upload_bps == 0
    }
}

/// Lifecycle states reported for a transfer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Waiting for a slot or a file check.
    Queued,
    /// Verifying existing data on disk.
    Checking,
    /// Resolving descriptor metadata from peers.
    FetchingMetadata,
    /// Actively downloading.
    Transferring,
    /// All wanted data is present; not yet seeding.
    Finished,
    /// Complete and uploading to peers.
    Seeding,
    /// Reserving storage.
    Allocating,
    /// Engine reported a failure for the transfer.
    Error,
    /// Engine reported a code this crate does not recognise.
    Unknown,
}

impl LifecycleState {
    /// Whether the transfer's data is complete.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Finished | Self::Seeding)
    }

    /// Human-readable label used by front ends.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Queued => "Queued",
            Self::Checking => "Checking",
            Self::FetchingMetadata => "Downloading Metadata",
            Self::Transferring => "Downloading",
            Self::Finished => "Finished",
            Self::Seeding => "Seeding",
            Self::Allocating => "Allocating",
            Self::Error => "Error",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot returned by the engine for a single handle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineStatus {
    /// Display name reported by the engine.
    pub name: String,
    /// Completion fraction in `0.0..=1.0`.
    pub progress: f64,
    /// Current download rate in bytes per second.
    pub download_bps: u64,
    /// Current upload rate in bytes per second.
    pub upload_bps: u64,
    /// Connected peer count.
    pub peers: u32,
    /// Mapped lifecycle state.
    pub state: LifecycleState,
}

/// Status row surfaced to front ends; re-derived on every query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferStatus {
    /// Identifier assigned by the lifecycle manager.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Nominal (final) save path.
    pub save_path: PathBuf,
    /// Completion fraction in `0.0..=1.0`.
    pub progress: f64,
    /// Current download rate in bytes per second.
    pub download_bps: u64,
    /// Current upload rate in bytes per second.
    pub upload_bps: u64,
    /// Connected peer count.
    pub peers: u32,
    /// Current lifecycle state.
    pub state: LifecycleState,
    /// Whether the data has been relocated out of staging.
    pub finalized: bool,
}
