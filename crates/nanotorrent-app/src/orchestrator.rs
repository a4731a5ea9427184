//! Transfer lifecycle manager: wires the engine, the staging area and the
//! metadata store together and drives completion detection.
//!
//! # Design
//! - The registry is private state behind one `tokio::sync::Mutex`; the lock
//!   is held only to copy handle data or mutate entries. Engine calls and
//!   file moves run with the lock released.
//! - The `finalized` flag is checked and set under the lock before a move
//!   starts, so each transfer is finalized at most once.
//! - One background task ticks `poll_once`; `shutdown` stops and joins it
//!   before persisting.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use nanotorrent_fsops::{FinalizeReport, FinalizeRequest, StagingManager};
use nanotorrent_runtime::{MetadataRecord, MetadataStore, RecordSnapshot};
use nanotorrent_telemetry::Metrics;
use nanotorrent_torrent_core::{
    DescriptorSource, RateLimits, TransferDescriptor, TransferEngine, TransferHandle,
    TransferStatus,
};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{LifecycleError, LifecycleResult};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runtime parameters for a [`TransferManager`].
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Location of the metadata file.
    pub metadata_file: PathBuf,
    /// Interval between polling ticks.
    pub poll_interval: Duration,
}

/// Outcome of [`TransferManager::reload_from_disk`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadReport {
    /// Records registered with the engine.
    pub restored: usize,
    /// Records dropped because the descriptor or engine rejected them.
    pub skipped: usize,
    /// Interrupted finalizes that were completed during reload.
    pub resumed: usize,
}

/// Outcome of one polling tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Unfinalized transfers whose status was queried.
    pub checked: usize,
    /// Status queries that failed.
    pub status_failures: usize,
    /// Transfers finalized during this tick.
    pub finalized: usize,
    /// Files that could not be moved during this tick.
    pub file_failures: usize,
}

#[derive(Debug, Clone)]
struct TransferEntry {
    id: Uuid,
    handle: TransferHandle,
    descriptor: TransferDescriptor,
    save_path: PathBuf,
    storage_root: PathBuf,
    finalized: bool,
    last_progress: f64,
    added_at: DateTime<Utc>,
}

impl TransferEntry {
    fn files(&self) -> Vec<PathBuf> {
        relative_files(&self.descriptor)
    }
}

#[derive(Debug, Default)]
struct Registry {
    entries: Vec<TransferEntry>,
}

impl Registry {
    fn get(&self, id: Uuid) -> Option<&TransferEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Option<&mut TransferEntry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    fn take(&mut self, id: Uuid) -> Option<TransferEntry> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index))
    }
}

struct Poller {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

struct ManagerInner {
    engine: Arc<dyn TransferEngine>,
    staging: StagingManager,
    store: MetadataStore,
    metrics: Metrics,
    registry: Mutex<Registry>,
    shut_down: AtomicBool,
}

/// Owns every live transfer and its lifecycle.
#[derive(Clone)]
pub struct TransferManager {
    inner: Arc<ManagerInner>,
    poller: Arc<Mutex<Option<Poller>>>,
    poll_interval: Duration,
}

impl TransferManager {
    /// Build a manager without reloading metadata or starting the poller.
    #[must_use]
    pub fn new(engine: Arc<dyn TransferEngine>, config: ManagerConfig, metrics: Metrics) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                engine,
                staging: StagingManager::new(),
                store: MetadataStore::new(config.metadata_file),
                metrics,
                registry: Mutex::new(Registry::default()),
                shut_down: AtomicBool::new(false),
            }),
            poller: Arc::new(Mutex::new(None)),
            poll_interval: config.poll_interval,
        }
    }

    /// Build a manager, restore persisted transfers and start polling.
    pub async fn start(
        engine: Arc<dyn TransferEngine>,
        config: ManagerConfig,
        metrics: Metrics,
    ) -> Self {
        let manager = Self::new(engine, config, metrics);
        let report = manager.reload_from_disk().await;
        info!(
            restored = report.restored,
            skipped = report.skipped,
            resumed = report.resumed,
            "transfer state restored"
        );
        manager.spawn_poller().await;
        manager
    }

    /// Start the background polling task if it is not already running.
    pub async fn spawn_poller(&self) {
        let mut slot = self.poller.lock().await;
        if slot.is_some() || self.inner.shut_down.load(Ordering::SeqCst) {
            return;
        }
        let (stop, mut stopped) = watch::channel(false);
        let inner = Arc::clone(&self.inner);
        let period = self.poll_interval.max(MIN_POLL_INTERVAL);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        inner.poll_once().await;
                    }
                }
            }
            debug!("poller stopped");
        });
        *slot = Some(Poller { stop, task });
    }

    /// Register a new transfer downloading into the staging area of `save_path`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Configuration`] for empty inputs and
    /// [`LifecycleError::AddTransfer`] when reading, staging or engine
    /// registration fails. No entry is recorded on error.
    pub async fn add_transfer(
        &self,
        source: DescriptorSource,
        save_path: &Path,
    ) -> LifecycleResult<Uuid> {
        if source.is_empty() {
            return Err(LifecycleError::Configuration {
                field: "descriptor",
                reason: "descriptor source is empty",
            });
        }
        if save_path.as_os_str().is_empty() {
            return Err(LifecycleError::Configuration {
                field: "save_path",
                reason: "save path is empty",
            });
        }

        let bytes = match source {
            DescriptorSource::Path { path } => tokio::fs::read(&path)
                .await
                .map_err(|err| LifecycleError::add("read_descriptor", err))?,
            DescriptorSource::Bytes { bytes } => bytes,
        };
        let descriptor = TransferDescriptor::parse(bytes)
            .map_err(|err| LifecycleError::add("parse_descriptor", err))?;

        let staging = self.inner.staging;
        let owned = save_path.to_path_buf();
        let storage_root = tokio::task::spawn_blocking(move || staging.prepare_staging(&owned))
            .await
            .map_err(|err| LifecycleError::task("prepare_staging", err))?
            .map_err(|err| LifecycleError::add("prepare_staging", err))?;

        let handle = self
            .inner
            .engine
            .add_transfer(&descriptor, &storage_root)
            .await
            .map_err(|err| LifecycleError::add("register", err))?;

        let name = descriptor.name().to_string();
        let id = self
            .inner
            .push(TransferEntry {
                id: Uuid::new_v4(),
                handle,
                descriptor,
                save_path: save_path.to_path_buf(),
                storage_root,
                finalized: false,
                last_progress: 0.0,
                added_at: Utc::now(),
            })
            .await;
        info!(
            transfer_id = %id,
            name,
            save_path = %save_path.display(),
            "transfer added"
        );
        self.inner.metrics.inc_transfers_added();
        Ok(id)
    }

    /// Current status of every transfer, in add order.
    ///
    /// Transfers whose status cannot be queried are logged and left out.
    pub async fn list_transfers(&self) -> Vec<TransferStatus> {
        let entries = self.inner.registry.lock().await.entries.clone();
        let mut statuses = Vec::with_capacity(entries.len());
        for entry in &entries {
            if let Some(status) = self.inner.status_of(entry).await {
                statuses.push(status);
            }
        }
        statuses
    }

    /// Current status of one transfer, or `None` if unknown or unqueryable.
    pub async fn get(&self, id: Uuid) -> Option<TransferStatus> {
        let entry = self.inner.registry.lock().await.get(id).cloned()?;
        self.inner.status_of(&entry).await
    }

    /// Remove a transfer from the engine and the registry.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for an unknown id and
    /// [`LifecycleError::Engine`] when the engine refuses; the entry is kept
    /// in that case.
    pub async fn remove_transfer(&self, id: Uuid, delete_files: bool) -> LifecycleResult<()> {
        let handle = self
            .inner
            .registry
            .lock()
            .await
            .get(id)
            .map(|entry| entry.handle)
            .ok_or(LifecycleError::NotFound { id })?;

        self.inner
            .engine
            .remove_transfer(handle, delete_files)
            .await
            .map_err(|err| LifecycleError::engine("remove_transfer", Some(id), err))?;

        let removed = self.inner.registry.lock().await.take(id);
        let Some(entry) = removed else {
            return Ok(());
        };
        self.inner.refresh_gauge().await;
        self.inner.metrics.inc_transfers_removed();

        if delete_files && entry.finalized && entry.storage_root != entry.save_path {
            let save_path = entry.save_path.clone();
            let files = entry.files();
            tokio::task::spawn_blocking(move || delete_payload(&save_path, &files))
                .await
                .map_err(|err| LifecycleError::task("delete_payload", err))?;
        }

        info!(
            transfer_id = %id,
            name = %entry.descriptor.name(),
            added_at = %entry.added_at,
            delete_files,
            "transfer removed"
        );
        Ok(())
    }

    /// Write every registered transfer to the metadata file.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Persistence`] when the file cannot be
    /// written; the previous file is left in place.
    pub async fn persist_all(&self) -> LifecycleResult<usize> {
        self.inner.persist_all().await
    }

    /// Restore transfers recorded in the metadata file.
    ///
    /// Records whose descriptor copy is missing or unreadable, or which the
    /// engine rejects, are logged and skipped. Interrupted finalizes are
    /// completed before the transfer is registered.
    pub async fn reload_from_disk(&self) -> ReloadReport {
        self.inner.reload_from_disk().await
    }

    /// Run one polling tick.
    pub async fn poll_once(&self) -> PollReport {
        self.inner.poll_once().await
    }

    /// Apply session-wide rate limits.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Engine`] when the engine rejects the limits.
    pub async fn set_rate_limits(&self, limits: RateLimits) -> LifecycleResult<()> {
        self.inner
            .engine
            .set_rate_limits(limits)
            .await
            .map_err(|err| LifecycleError::engine("set_rate_limits", None, err))?;
        info!(
            download_bps = limits.download_bps,
            upload_bps = limits.upload_bps,
            "rate limits applied"
        );
        Ok(())
    }

    /// Stop polling, persist state and pause the engine.
    ///
    /// A second call returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Engine`] when the engine cannot be paused.
    /// Persistence failures are logged only.
    pub async fn shutdown(&self) -> LifecycleResult<()> {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(poller) = self.poller.lock().await.take() {
            if poller.stop.send(true).is_err() {
                debug!("poller already stopped");
            }
            if let Err(err) = poller.task.await {
                warn!(error = %err, "poller task ended abnormally");
            }
        }

        if let Err(err) = self.inner.persist_all().await {
            warn!(error = %err, "metadata not saved during shutdown");
        }

        self.inner
            .engine
            .pause()
            .await
            .map_err(|err| LifecycleError::engine("pause", None, err))?;
        info!("transfer manager shut down");
        Ok(())
    }
}

impl ManagerInner {
    /// Registers `entry`, re-keying it if its id is already taken.
    async fn push(&self, mut entry: TransferEntry) -> Uuid {
        let (id, count) = {
            let mut registry = self.registry.lock().await;
            if registry.get(entry.id).is_some() {
                let fresh = Uuid::new_v4();
                warn!(transfer_id = %entry.id, new_id = %fresh, "duplicate transfer id, reassigned");
                entry.id = fresh;
            }
            let id = entry.id;
            registry.entries.push(entry);
            (id, registry.entries.len())
        };
        self.metrics.set_active_transfers(count);
        id
    }

    async fn refresh_gauge(&self) {
        let count = self.registry.lock().await.entries.len();
        self.metrics.set_active_transfers(count);
    }

    async fn status_of(&self, entry: &TransferEntry) -> Option<TransferStatus> {
        match self.engine.status(entry.handle).await {
            Ok(status) => Some(TransferStatus {
                id: entry.id,
                name: entry.descriptor.name().to_string(),
                save_path: entry.save_path.clone(),
                progress: status.progress,
                download_bps: status.download_bps,
                upload_bps: status.upload_bps,
                peers: status.peers,
                state: status.state,
                finalized: entry.finalized,
            }),
            Err(err) => {
                warn!(transfer_id = %entry.id, error = %err, "status query failed");
                self.metrics.inc_status_query_failures();
                None
            }
        }
    }

    async fn persist_all(&self) -> LifecycleResult<usize> {
        let entries = self.registry.lock().await.entries.clone();
        let mut snapshots = Vec::with_capacity(entries.len());
        for entry in entries {
            let progress = match self.engine.status(entry.handle).await {
                Ok(status) => status.progress,
                Err(err) => {
                    debug!(
                        transfer_id = %entry.id,
                        error = %err,
                        "status unavailable, keeping last progress"
                    );
                    entry.last_progress
                }
            };
            snapshots.push(RecordSnapshot {
                id: entry.id,
                descriptor: entry.descriptor,
                save_path: entry.save_path,
                progress,
                finalized: entry.finalized,
            });
        }

        let store = self.store.clone();
        let saved = tokio::task::spawn_blocking(move || store.save(&snapshots))
            .await
            .map_err(|err| LifecycleError::task("persist_all", err))?;
        match saved {
            Ok(count) => {
                debug!(count, path = %self.store.path().display(), "metadata saved");
                Ok(count)
            }
            Err(source) => {
                warn!(
                    path = %self.store.path().display(),
                    error = %source,
                    "failed to save metadata"
                );
                self.metrics.inc_metadata_save_failures();
                Err(LifecycleError::Persistence { source })
            }
        }
    }

    async fn reload_from_disk(&self) -> ReloadReport {
        let store = self.store.clone();
        let records = match tokio::task::spawn_blocking(move || store.load()).await {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "metadata load task failed");
                return ReloadReport::default();
            }
        };

        let mut report = ReloadReport::default();
        for record in records {
            match self.restore(record).await {
                Some(resumed) => {
                    report.restored += 1;
                    if resumed {
                        report.resumed += 1;
                    }
                }
                None => report.skipped += 1,
            }
        }
        report
    }

    /// Returns `Some(resumed)` when the record was registered.
    async fn restore(&self, record: MetadataRecord) -> Option<bool> {
        let bytes = match tokio::fs::read(&record.torrent_file).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(
                    name = %record.name,
                    descriptor = %record.torrent_file.display(),
                    error = %err,
                    "saved descriptor unreadable, skipping"
                );
                return None;
            }
        };
        let descriptor = match TransferDescriptor::parse(bytes) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(
                    name = %record.name,
                    descriptor = %record.torrent_file.display(),
                    error = %err,
                    "saved descriptor invalid, skipping"
                );
                return None;
            }
        };

        let staging = self.staging;
        let save_path = record.save_path.clone();
        let files = relative_files(&descriptor);
        let name = descriptor.name().to_string();
        let was_finalized = record.finalized;
        let placement = tokio::task::spawn_blocking(move || {
            place_for_reload(staging, &name, &save_path, files, was_finalized)
        })
        .await;
        let placement = match placement {
            Ok(Ok(placement)) => placement,
            Ok(Err(err)) => {
                warn!(name = %record.name, error = %err, "staging unavailable, skipping");
                return None;
            }
            Err(err) => {
                warn!(name = %record.name, error = %err, "reload task failed");
                return None;
            }
        };

        if let Some(report) = &placement.resumed {
            self.record_finalize(report);
        }

        let handle = match self
            .engine
            .add_transfer(&descriptor, &placement.storage_root)
            .await
        {
            Ok(handle) => handle,
            Err(err) => {
                warn!(name = %record.name, error = %err, "engine rejected restored transfer");
                return None;
            }
        };

        let storage_root = placement.storage_root.display().to_string();
        let id = self
            .push(TransferEntry {
                id: record.id,
                handle,
                descriptor,
                save_path: record.save_path,
                storage_root: placement.storage_root,
                finalized: placement.finalized,
                last_progress: record.progress,
                added_at: Utc::now(),
            })
            .await;
        debug!(
            transfer_id = %id,
            name = %record.name,
            storage_root,
            finalized = placement.finalized,
            "transfer restored"
        );
        Some(placement.resumed.is_some())
    }

    async fn poll_once(&self) -> PollReport {
        if let Err(err) = self.engine.post_updates().await {
            warn!(error = %err, "engine update failed");
        }

        let pending: Vec<(Uuid, TransferHandle)> = self
            .registry
            .lock()
            .await
            .entries
            .iter()
            .filter(|entry| !entry.finalized)
            .map(|entry| (entry.id, entry.handle))
            .collect();

        let mut report = PollReport::default();
        for (id, handle) in pending {
            report.checked += 1;
            let status = match self.engine.status(handle).await {
                Ok(status) => status,
                Err(err) => {
                    warn!(transfer_id = %id, error = %err, "status query failed");
                    self.metrics.inc_status_query_failures();
                    report.status_failures += 1;
                    continue;
                }
            };

            let request = {
                let mut registry = self.registry.lock().await;
                let Some(entry) = registry.get_mut(id) else {
                    continue;
                };
                entry.last_progress = status.progress;
                if !status.state.is_complete() || entry.finalized {
                    continue;
                }
                entry.finalized = true;
                FinalizeRequest {
                    name: entry.descriptor.name().to_string(),
                    save_path: entry.save_path.clone(),
                    files: entry.files(),
                }
            };

            info!(transfer_id = %id, name = %request.name, "transfer complete, finalizing");
            let staging = self.staging;
            match tokio::task::spawn_blocking(move || staging.finalize(&request)).await {
                Ok(outcome) => {
                    report.finalized += 1;
                    report.file_failures += outcome.failed();
                    self.record_finalize(&outcome);
                }
                Err(err) => warn!(transfer_id = %id, error = %err, "finalize task failed"),
            }
        }
        report
    }

    fn record_finalize(&self, report: &FinalizeReport) {
        self.metrics.inc_transfers_finalized();
        if !report.is_clean() {
            self.metrics.add_finalize_file_failures(report.failed());
        }
    }
}

struct Placement {
    storage_root: PathBuf,
    finalized: bool,
    resumed: Option<FinalizeReport>,
}

fn place_for_reload(
    staging: StagingManager,
    name: &str,
    save_path: &Path,
    files: Vec<PathBuf>,
    was_finalized: bool,
) -> nanotorrent_fsops::FsOpsResult<Placement> {
    let layout = staging.inspect(save_path, &files);
    if layout.is_partially_final() {
        info!(name, "resuming interrupted finalize");
        let report = staging.finalize(&FinalizeRequest {
            name: name.to_string(),
            save_path: save_path.to_path_buf(),
            files,
        });
        return Ok(Placement {
            storage_root: save_path.to_path_buf(),
            finalized: true,
            resumed: Some(report),
        });
    }
    if layout.is_fully_final() || (was_finalized && layout.in_staging == 0) {
        return Ok(Placement {
            storage_root: save_path.to_path_buf(),
            finalized: true,
            resumed: None,
        });
    }
    Ok(Placement {
        storage_root: staging.prepare_staging(save_path)?,
        finalized: false,
        resumed: None,
    })
}

fn relative_files(descriptor: &TransferDescriptor) -> Vec<PathBuf> {
    descriptor
        .files()
        .iter()
        .map(nanotorrent_torrent_core::DescriptorFile::relative_path)
        .collect()
}

fn delete_payload(save_path: &Path, files: &[PathBuf]) {
    for relative in files {
        let path = save_path.join(relative);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %path.display(), error = %err, "failed to delete file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanotorrent_engine::{LocalEngine, SessionConfig};
    use nanotorrent_test_support::fixtures::{DescriptorBuilder, temp_dir};

    fn manager(root: &Path) -> anyhow::Result<TransferManager> {
        let engine = LocalEngine::create_session(SessionConfig::default())?;
        Ok(TransferManager::new(
            Arc::new(engine),
            ManagerConfig {
                metadata_file: root.join("meta.json"),
                poll_interval: Duration::from_millis(10),
            },
            Metrics::new()?,
        ))
    }

    #[test]
    fn registry_take_preserves_order() -> anyhow::Result<()> {
        let descriptor = TransferDescriptor::parse(DescriptorBuilder::new("a").file(&[], 1).build())?;
        let entry = |n: u64| TransferEntry {
            id: Uuid::new_v4(),
            handle: TransferHandle(n),
            descriptor: descriptor.clone(),
            save_path: PathBuf::from("/data"),
            storage_root: PathBuf::from("/data/.incomplete"),
            finalized: false,
            last_progress: 0.0,
            added_at: Utc::now(),
        };
        let mut registry = Registry::default();
        registry.entries = vec![entry(1), entry(2), entry(3)];
        let middle = registry.entries[1].id;
        assert!(registry.take(middle).is_some());
        assert!(registry.take(middle).is_none());
        let handles: Vec<_> = registry.entries.iter().map(|e| e.handle.0).collect();
        assert_eq!(handles, vec![1, 3]);
        Ok(())
    }

    #[tokio::test]
    async fn empty_inputs_are_rejected_without_state_change() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let manager = manager(temp.path())?;
        let descriptor = DescriptorBuilder::new("A").file(&[], 4).build();

        let empty_source = manager
            .add_transfer(DescriptorSource::bytes(Vec::new()), temp.path())
            .await;
        assert!(matches!(
            empty_source,
            Err(LifecycleError::Configuration {
                field: "descriptor",
                ..
            })
        ));
        let empty_path = manager
            .add_transfer(DescriptorSource::bytes(descriptor), Path::new(""))
            .await;
        assert!(matches!(
            empty_path,
            Err(LifecycleError::Configuration {
                field: "save_path",
                ..
            })
        ));
        assert!(manager.list_transfers().await.is_empty());
        assert!(!temp.path().join(".incomplete").exists());
        Ok(())
    }

    #[tokio::test]
    async fn unparseable_descriptor_reports_stage() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let manager = manager(temp.path())?;
        let result = manager
            .add_transfer(DescriptorSource::bytes(b"not bencode".to_vec()), temp.path())
            .await;
        assert!(matches!(
            result,
            Err(LifecycleError::AddTransfer {
                stage: "parse_descriptor",
                ..
            })
        ));
        assert!(manager.list_transfers().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let manager = manager(temp.path())?;
        let id = Uuid::new_v4();
        let result = manager.remove_transfer(id, false).await;
        assert!(matches!(result, Err(LifecycleError::NotFound { id: found }) if found == id));
        assert!(manager.get(id).await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn reloading_twice_rekeys_duplicate_ids() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let first = manager(temp.path())?;
        let original = first
            .add_transfer(
                DescriptorSource::bytes(DescriptorBuilder::new("A").file(&[], 4).build()),
                &temp.path().join("data"),
            )
            .await?;
        first.persist_all().await?;

        let second = manager(temp.path())?;
        assert_eq!(second.reload_from_disk().await.restored, 1);
        assert_eq!(second.reload_from_disk().await.restored, 1);
        let ids: Vec<_> = second.list_transfers().await.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], original);
        assert_ne!(ids[1], original);
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() -> anyhow::Result<()> {
        let temp = temp_dir()?;
        let manager = manager(temp.path())?;
        manager.spawn_poller().await;
        manager.shutdown().await?;
        manager.shutdown().await?;
        assert!(temp.path().join("meta.json").is_file());
        Ok(())
    }
}
