//! Engine facade trait implemented by transfer engine adapters.

use std::path::Path;

use async_trait::async_trait;

use crate::error::TorrentResult;
use crate::metainfo::TransferDescriptor;
use crate::model::{EngineStatus, RateLimits, TransferHandle};

/// Thin facade over an external transfer engine session.
///
/// Implementations surface every failure to the caller; classification
/// (fatal, per-transfer, retryable) is the caller's decision.
#[async_trait]
pub trait TransferEngine: Send + Sync {
    /// Register a transfer whose data will be written under `save_path`.
    async fn add_transfer(
        &self,
        descriptor: &TransferDescriptor,
        save_path: &Path,
    ) -> TorrentResult<TransferHandle>;

    /// Drop a transfer from the session, optionally deleting its data.
    async fn remove_transfer(&self, handle: TransferHandle, delete_files: bool)
    -> TorrentResult<()>;

    /// Query the current status of one transfer.
    async fn status(&self, handle: TransferHandle) -> TorrentResult<EngineStatus>;

    /// Apply session-wide rate limits.
    async fn set_rate_limits(&self, limits: RateLimits) -> TorrentResult<()>;

    /// Pause the whole session.
    async fn pause(&self) -> TorrentResult<()>;

    /// Resume a paused session.
    async fn resume(&self) -> TorrentResult<()>;

    /// Refresh engine-internal bookkeeping; called on every polling tick.
    async fn post_updates(&self) -> TorrentResult<()> {
        Ok(())
    }
}
