use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nanotorrent_app::{LifecycleError, ManagerConfig, TransferManager};
use nanotorrent_telemetry::Metrics;
use nanotorrent_test_support::fixtures::{DescriptorBuilder, temp_dir};
use nanotorrent_torrent_core::{
    DescriptorSource, EngineStatus, LifecycleState, RateLimits, TorrentError, TorrentResult,
    TransferDescriptor, TransferEngine, TransferHandle,
};

/// Engine double whose failures are switched on per handle or per operation.
#[derive(Default)]
struct ScriptedEngine {
    next: AtomicU64,
    failing_status: Mutex<HashSet<TransferHandle>>,
    reject_adds: AtomicBool,
    reject_removes: AtomicBool,
    limits: Mutex<Option<RateLimits>>,
    paused: AtomicBool,
}

impl ScriptedEngine {
    fn fail_status_for(&self, handle: TransferHandle) {
        if let Ok(mut failing) = self.failing_status.lock() {
            failing.insert(handle);
        }
    }

    fn scripted(operation: &'static str) -> TorrentError {
        TorrentError::OperationFailed {
            operation,
            source: Box::new(io::Error::other("scripted failure")),
        }
    }
}

#[async_trait]
impl TransferEngine for ScriptedEngine {
    async fn add_transfer(
        &self,
        _descriptor: &TransferDescriptor,
        _save_path: &Path,
    ) -> TorrentResult<TransferHandle> {
        if self.reject_adds.load(Ordering::SeqCst) {
            return Err(Self::scripted("add_transfer"));
        }
        Ok(TransferHandle(self.next.fetch_add(1, Ordering::SeqCst)))
    }

    async fn remove_transfer(
        &self,
        _handle: TransferHandle,
        _delete_files: bool,
    ) -> TorrentResult<()> {
        if self.reject_removes.load(Ordering::SeqCst) {
            return Err(Self::scripted("remove_transfer"));
        }
        Ok(())
    }

    async fn status(&self, handle: TransferHandle) -> TorrentResult<EngineStatus> {
        let failing = self
            .failing_status
            .lock()
            .map(|set| set.contains(&handle))
            .unwrap_or(true);
        if failing {
            return Err(TorrentError::UnknownHandle { handle });
        }
        Ok(EngineStatus {
            name: format!("handle-{}", handle.0),
            progress: 0.5,
            download_bps: 1024,
            upload_bps: 0,
            peers: 2,
            state: LifecycleState::Transferring,
        })
    }

    async fn set_rate_limits(&self, limits: RateLimits) -> TorrentResult<()> {
        if let Ok(mut slot) = self.limits.lock() {
            *slot = Some(limits);
        }
        Ok(())
    }

    async fn pause(&self) -> TorrentResult<()> {
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&self) -> TorrentResult<()> {
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }
}

fn manager(engine: Arc<ScriptedEngine>, root: &Path) -> anyhow::Result<(TransferManager, Metrics)> {
    let metrics = Metrics::new()?;
    let manager = TransferManager::new(
        engine,
        ManagerConfig {
            metadata_file: root.join("meta.json"),
            poll_interval: Duration::from_secs(1),
        },
        metrics.clone(),
    );
    Ok((manager, metrics))
}

fn descriptor(name: &str) -> DescriptorSource {
    DescriptorSource::bytes(DescriptorBuilder::new(name).file(&[], 4).build())
}

#[tokio::test]
async fn failing_status_omits_only_that_transfer() -> anyhow::Result<()> {
    let temp = temp_dir()?;
    let engine = Arc::new(ScriptedEngine::default());
    let (manager, metrics) = manager(Arc::clone(&engine), temp.path())?;
    for name in ["A", "B", "C"] {
        manager.add_transfer(descriptor(name), temp.path()).await?;
    }
    engine.fail_status_for(TransferHandle(1));

    let names: Vec<_> = manager
        .list_transfers()
        .await
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["A", "C"]);
    assert_eq!(metrics.snapshot().status_query_failures_total, 1);

    let report = manager.poll_once().await;
    assert_eq!(report.checked, 3);
    assert_eq!(report.status_failures, 1);
    assert_eq!(report.finalized, 0);
    Ok(())
}

#[tokio::test]
async fn failing_status_keeps_last_progress_when_persisting() -> anyhow::Result<()> {
    let temp = temp_dir()?;
    let engine = Arc::new(ScriptedEngine::default());
    let (manager, _) = manager(Arc::clone(&engine), temp.path())?;
    manager.add_transfer(descriptor("A"), temp.path()).await?;
    manager.poll_once().await;
    engine.fail_status_for(TransferHandle(0));

    assert_eq!(manager.persist_all().await?, 1);
    let document: serde_json::Value =
        serde_json::from_slice(&std::fs::read(temp.path().join("meta.json"))?)?;
    assert_eq!(document["torrents"][0]["name"], "A");
    assert_eq!(document["torrents"][0]["progress"], 0.5);
    Ok(())
}

#[tokio::test]
async fn engine_rejection_leaves_no_entry() -> anyhow::Result<()> {
    let temp = temp_dir()?;
    let engine = Arc::new(ScriptedEngine::default());
    engine.reject_adds.store(true, Ordering::SeqCst);
    let (manager, metrics) = manager(engine, temp.path())?;

    let result = manager.add_transfer(descriptor("A"), temp.path()).await;
    assert!(matches!(
        result,
        Err(LifecycleError::AddTransfer {
            stage: "register",
            ..
        })
    ));
    assert!(manager.list_transfers().await.is_empty());
    assert_eq!(metrics.snapshot().transfers_added_total, 0);
    Ok(())
}

#[tokio::test]
async fn failed_removal_keeps_the_entry() -> anyhow::Result<()> {
    let temp = temp_dir()?;
    let engine = Arc::new(ScriptedEngine::default());
    let (manager, _) = manager(Arc::clone(&engine), temp.path())?;
    let id = manager.add_transfer(descriptor("A"), temp.path()).await?;

    engine.reject_removes.store(true, Ordering::SeqCst);
    let result = manager.remove_transfer(id, false).await;
    assert!(matches!(
        result,
        Err(LifecycleError::Engine {
            operation: "remove_transfer",
            id: Some(found),
            ..
        }) if found == id
    ));
    assert_eq!(manager.list_transfers().await.len(), 1);

    engine.reject_removes.store(false, Ordering::SeqCst);
    manager.remove_transfer(id, false).await?;
    assert!(manager.list_transfers().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn rate_limits_and_shutdown_reach_the_engine() -> anyhow::Result<()> {
    let temp = temp_dir()?;
    let engine = Arc::new(ScriptedEngine::default());
    let (manager, _) = manager(Arc::clone(&engine), temp.path())?;
    let limits = RateLimits {
        download_bps: 4096,
        upload_bps: 512,
    };
    manager.set_rate_limits(limits).await?;
    assert_eq!(engine.limits.lock().ok().and_then(|slot| *slot), Some(limits));

    manager.shutdown().await?;
    assert!(engine.paused.load(Ordering::SeqCst));
    Ok(())
}
