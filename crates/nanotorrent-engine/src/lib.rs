#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Local transfer engine implementing the [`TransferEngine`] facade.
//!
//! The session tracks payload already present under each transfer's storage
//! root; it never talks to peers.

/// Native state code mapping.
pub mod convert;
mod session;
/// Session configuration and native state codes.
pub mod types;

pub use convert::map_state;
pub use types::{PortRange, SessionConfig};

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use nanotorrent_torrent_core::{
    EngineStatus, RateLimits, TorrentError, TorrentResult, TransferDescriptor, TransferEngine,
    TransferHandle,
};
use session::LocalSession;
use tracing::{debug, info};

/// Engine session handle. Clones share the same session.
#[derive(Clone)]
pub struct LocalEngine {
    config: SessionConfig,
    session: Arc<Mutex<LocalSession>>,
}

impl LocalEngine {
    /// Start a session with the supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::InvalidSession`] when the listen port range is
    /// empty or starts at zero.
    pub fn create_session(config: SessionConfig) -> TorrentResult<Self> {
        config.validate()?;
        info!(
            listen_start = config.listen_ports.start,
            listen_end = config.listen_ports.end,
            download_bps = config.rate_limits.download_bps,
            upload_bps = config.rate_limits.upload_bps,
            "transfer engine session created"
        );
        Ok(Self {
            config,
            session: Arc::new(Mutex::new(LocalSession::new(config.rate_limits))),
        })
    }

    /// Configuration the session was created with.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Rate limits currently applied to the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session lock is poisoned.
    pub fn rate_limits(&self) -> TorrentResult<RateLimits> {
        Ok(lock(&self.session, "rate_limits")?.limits())
    }

    /// Whether the session is paused.
    ///
    /// # Errors
    ///
    /// Returns an error if the session lock is poisoned.
    pub fn is_paused(&self) -> TorrentResult<bool> {
        Ok(lock(&self.session, "is_paused")?.is_paused())
    }

    async fn blocking<T, F>(&self, operation: &'static str, job: F) -> TorrentResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut LocalSession) -> TorrentResult<T> + Send + 'static,
    {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&session, operation)?;
            job(&mut guard)
        })
        .await
        .map_err(|err| TorrentError::OperationFailed {
            operation,
            source: Box::new(err),
        })?
    }
}

fn lock<'a>(
    session: &'a Mutex<LocalSession>,
    operation: &'static str,
) -> TorrentResult<MutexGuard<'a, LocalSession>> {
    session.lock().map_err(|_| TorrentError::OperationFailed {
        operation,
        source: Box::new(io::Error::other("engine session lock poisoned")),
    })
}

#[async_trait]
impl TransferEngine for LocalEngine {
    async fn add_transfer(
        &self,
        descriptor: &TransferDescriptor,
        save_path: &Path,
    ) -> TorrentResult<TransferHandle> {
        let descriptor = descriptor.clone();
        let save_path = save_path.to_path_buf();
        self.blocking("add_transfer", move |session| {
            session.add(&descriptor, &save_path)
        })
        .await
    }

    async fn remove_transfer(
        &self,
        handle: TransferHandle,
        delete_files: bool,
    ) -> TorrentResult<()> {
        self.blocking("remove_transfer", move |session| {
            session.remove(handle, delete_files)
        })
        .await?;
        debug!(%handle, delete_files, "transfer removed from session");
        Ok(())
    }

    async fn status(&self, handle: TransferHandle) -> TorrentResult<EngineStatus> {
        lock(&self.session, "status")?.status(handle)
    }

    async fn set_rate_limits(&self, limits: RateLimits) -> TorrentResult<()> {
        lock(&self.session, "set_rate_limits")?.set_limits(limits);
        info!(
            download_bps = limits.download_bps,
            upload_bps = limits.upload_bps,
            "session rate limits applied"
        );
        Ok(())
    }

    async fn pause(&self) -> TorrentResult<()> {
        lock(&self.session, "pause")?.set_paused(true);
        info!("transfer engine session paused");
        Ok(())
    }

    async fn resume(&self) -> TorrentResult<()> {
        lock(&self.session, "resume")?.set_paused(false);
        info!("transfer engine session resumed");
        Ok(())
    }

    async fn post_updates(&self) -> TorrentResult<()> {
        self.blocking("post_updates", |session| {
            session.refresh();
            Ok(())
        })
        .await
    }
}
